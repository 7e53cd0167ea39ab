//! Table schemas of the OIFITS interferometry exchange format.

use crate::schema::{Accepted, ColumnDescriptor, DataRange, KeywordDescriptor, TableSchema};
use crate::types::CellType;
use crate::units::Unit;
use crate::validation::{ColumnValue, TableData, ValidationContext, UNDEFINED_SHORT};

pub const OI_TARGET: &str = "OI_TARGET";
pub const OI_WAVELENGTH: &str = "OI_WAVELENGTH";
pub const OI_VIS2: &str = "OI_VIS2";

/// Context key of the wavelength count of the referenced OI_WAVELENGTH table.
pub const NWAVE: &str = "NWAVE";
/// Context key of the instrument names declared by OI_WAVELENGTH tables.
pub const INSNAMES: &str = "INSNAME";
/// Context key of the target identifiers declared by OI_TARGET.
pub const TARGET_IDS: &str = "TARGET_ID";

const EXTNAMES: [&str; 8] = [
    "OI_ARRAY",
    "OI_TARGET",
    "OI_WAVELENGTH",
    "OI_VIS",
    "OI_VIS2",
    "OI_T3",
    "OI_SPECTRUM",
    "OI_FLUX",
];

fn table(extname: &str) -> TableSchema {
    TableSchema::new(extname)
        .keyword(
            KeywordDescriptor::new("EXTNAME", "extension name", CellType::Char).accepted(
                Accepted::Strings(EXTNAMES.iter().map(|s| s.to_string()).collect()),
            ),
        )
        .keyword(
            KeywordDescriptor::new("OI_REVN", "revision number of the table definition", CellType::Int)
                .accepted(Accepted::Integers(vec![1, 2])),
        )
}

pub fn oi_target() -> TableSchema {
    table(OI_TARGET)
        .column(ColumnDescriptor::new("TARGET_ID", "index number", CellType::Short))
        .column(ColumnDescriptor::new("TARGET", "target name", CellType::Char).repeat(16))
        .column(
            ColumnDescriptor::new("RAEP0", "RA at mean equinox", CellType::Double)
                .unit(Unit::Degree),
        )
        .column(
            ColumnDescriptor::new("DECEP0", "DEC at mean equinox", CellType::Double)
                .unit(Unit::Degree),
        )
        .column(
            ColumnDescriptor::new("EQUINOX", "equinox", CellType::Real).unit(Unit::Year),
        )
}

pub fn oi_wavelength() -> TableSchema {
    table(OI_WAVELENGTH)
        .keyword(KeywordDescriptor::new("INSNAME", "name of detector for cross-referencing", CellType::Char))
        .column(
            ColumnDescriptor::new("EFF_WAVE", "effective wavelength of channel", CellType::Real)
                .unit(Unit::Meter)
                .range(DataRange::PositiveStrict),
        )
        .column(
            ColumnDescriptor::new("EFF_BAND", "effective bandpass of channel", CellType::Real)
                .unit(Unit::Meter)
                .range(DataRange::PositiveStrict),
        )
}

pub fn oi_vis2() -> TableSchema {
    table(OI_VIS2)
        .keyword(KeywordDescriptor::new("DATE-OBS", "UTC start date of observations", CellType::Char))
        .keyword(
            KeywordDescriptor::new("ARRNAME", "name of corresponding array", CellType::Char)
                .optional(),
        )
        .keyword(
            KeywordDescriptor::new("INSNAME", "name of corresponding detector", CellType::Char)
                .accepted(Accepted::StringReference(INSNAMES.to_string())),
        )
        .column(
            ColumnDescriptor::new("TARGET_ID", "target number as index into OI_TARGET table", CellType::Short)
                .accepted(Accepted::IntegerReference(TARGET_IDS.to_string())),
        )
        .column(
            ColumnDescriptor::new("TIME", "UTC time of observation", CellType::Double)
                .unit(Unit::Second)
                .range(DataRange::Positive),
        )
        .column(ColumnDescriptor::new("MJD", "modified Julian Day", CellType::Double).unit(Unit::Day))
        .column(
            ColumnDescriptor::new("INT_TIME", "integration time", CellType::Double)
                .unit(Unit::Second)
                .range(DataRange::PositiveStrict),
        )
        .column(
            ColumnDescriptor::new("VIS2DATA", "squared visibility", CellType::Double)
                .repeat_from(NWAVE)
                .error_column("VIS2ERR"),
        )
        .column(
            ColumnDescriptor::new("VIS2ERR", "error in squared visibility", CellType::Double)
                .repeat_from(NWAVE)
                .range(DataRange::PositiveStrict),
        )
        .column(ColumnDescriptor::new("UCOORD", "U coordinate of the data", CellType::Double).unit(Unit::Meter))
        .column(ColumnDescriptor::new("VCOORD", "V coordinate of the data", CellType::Double).unit(Unit::Meter))
        .column(ColumnDescriptor::new("STA_INDEX", "station numbers contributing to the data", CellType::Short).repeat(2))
        .column(ColumnDescriptor::new("FLAG", "flag", CellType::Logical).repeat_from(NWAVE))
}

/// Schema for an extension name, if it is one of the supported tables.
pub fn schema_for(extname: &str) -> Option<TableSchema> {
    match extname {
        OI_TARGET => Some(oi_target()),
        OI_WAVELENGTH => Some(oi_wavelength()),
        OI_VIS2 => Some(oi_vis2()),
        _ => None,
    }
}

/// Feed the cross-referenced values a table declares into `context`.
/// Reference tables must be registered before the data tables are checked.
pub fn register(context: &mut ValidationContext, table: &TableData) {
    match table.extname.as_str() {
        OI_WAVELENGTH => {
            context.set_count(NWAVE, table.nb_rows as u32);
            if let Some(insname) = table.header.get_string("INSNAME") {
                context.set_strings(INSNAMES, vec![insname.trim().to_string()]);
            }
        }
        OI_TARGET => {
            if let Some(ColumnValue::Short(ids)) = table.column("TARGET_ID").map(|c| &c.value) {
                let ids = ids.iter().copied().filter(|&id| id != UNDEFINED_SHORT).collect();
                context.set_integers(TARGET_IDS, ids);
            }
        }
        other => log::debug!("{other} declares no cross references"),
    }
}

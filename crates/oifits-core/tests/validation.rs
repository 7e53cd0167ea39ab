//! Whole-table validation against the OIFITS schemas.

use ndarray::{arr1, arr2, ArrayD, IxDyn};
use oifits_core::header::{Card, Header};
use oifits_core::oifits::{self, register};
use oifits_core::validation::{
    check_table, CheckMode, Checker, Column, ColumnValue, Rule, Severity, TableData,
    ValidationContext,
};
use oifits_core::value::Value;

fn header(extname: &str, extra: &[(&str, Value)]) -> Header {
    let mut cards = vec![
        Card::new("EXTNAME", Value::String(extname.into()), None),
        Card::new("OI_REVN", Value::Integer(2), None),
    ];
    cards.extend(extra.iter().map(|(k, v)| Card::new(k, v.clone(), None)));
    Header::from_cards(cards)
}

fn wavelength_table() -> TableData {
    TableData::new(
        "OI_WAVELENGTH",
        header("OI_WAVELENGTH", &[("INSNAME", Value::String("GRAVITY".into()))]),
        3,
    )
    .with_column(Column::new(
        "EFF_WAVE",
        Some("m"),
        ColumnValue::Real(arr1(&[2.0e-6f32, 2.1e-6, 2.2e-6]).into_dyn()),
    ))
    .with_column(Column::new(
        "EFF_BAND",
        Some("m"),
        ColumnValue::Real(arr1(&[1e-8f32, 1e-8, f32::NAN]).into_dyn()),
    ))
}

fn target_table() -> TableData {
    TableData::new("OI_TARGET", header("OI_TARGET", &[]), 2)
        .with_column(Column::new("TARGET_ID", None, ColumnValue::Short(arr1(&[1i16, 2]).into_dyn())))
        .with_column(Column::new("TARGET", None, ColumnValue::strings([Some("VEGA"), Some("ALTAIR")])))
        .with_column(Column::new("RAEP0", Some("deg"), ColumnValue::Double(arr1(&[279.2, 297.7]).into_dyn())))
        .with_column(Column::new("DECEP0", Some("deg"), ColumnValue::Double(arr1(&[38.8, 8.9]).into_dyn())))
        .with_column(Column::new("EQUINOX", Some("year"), ColumnValue::Real(arr1(&[2000.0f32, 2000.0]).into_dyn())))
}

fn vis2_table(rows: usize) -> TableData {
    let doubles = |v: f64| ColumnValue::Double(ArrayD::from_elem(IxDyn(&[rows]), v));
    TableData::new(
        "OI_VIS2",
        header(
            "OI_VIS2",
            &[
                ("DATE-OBS", Value::String("2024-05-01".into())),
                ("INSNAME", Value::String("GRAVITY".into())),
            ],
        ),
        rows,
    )
    .with_column(Column::new("TARGET_ID", None, ColumnValue::Short(ArrayD::from_elem(IxDyn(&[rows]), 1i16))))
    .with_column(Column::new("TIME", Some("s"), doubles(0.0)))
    .with_column(Column::new("MJD", Some("day"), doubles(60431.0)))
    .with_column(Column::new("INT_TIME", Some("s"), doubles(10.0)))
    .with_column(Column::new("VIS2DATA", None, ColumnValue::Double(ArrayD::from_elem(IxDyn(&[rows, 3]), 0.8))))
    .with_column(Column::new("VIS2ERR", None, ColumnValue::Double(ArrayD::from_elem(IxDyn(&[rows, 3]), 0.01))))
    .with_column(Column::new("UCOORD", Some("m"), doubles(12.0)))
    .with_column(Column::new("VCOORD", Some("m"), doubles(-4.0)))
    .with_column(Column::new("STA_INDEX", None, ColumnValue::Short(ArrayD::from_elem(IxDyn(&[rows, 2]), 1i16))))
    .with_column(Column::new("FLAG", None, ColumnValue::Logical(ArrayD::from_elem(IxDyn(&[rows, 3]), false))))
}

/// Register the reference tables then check `table`.
fn check(table: &mut TableData, mode: CheckMode) -> Checker {
    let mut context = ValidationContext::new();
    let mut checker = Checker::new(mode);
    for mut reference in [target_table(), wavelength_table()] {
        register(&mut context, &reference);
        let schema = oifits::schema_for(&reference.extname).unwrap();
        check_table(&mut reference, &schema, &context, &mut checker);
    }
    let schema = oifits::schema_for(&table.extname).unwrap();
    check_table(table, &schema, &context, &mut checker);
    checker
}

#[test]
fn conforming_file_is_clean() {
    let checker = check(&mut vis2_table(4), CheckMode::FailFast);
    assert!(checker.diagnostics().is_empty(), "{}", checker.report());
    assert_eq!(checker.status(), "0 warnings, 0 severe errors");
}

#[test]
fn wavelength_count_drives_repeat() {
    let mut table = vis2_table(2);
    table.columns.retain(|c| c.name != "VIS2ERR");
    table.columns.push(Column::new(
        "VIS2ERR",
        None,
        ColumnValue::Double(arr2(&[[0.1, 0.1], [0.1, 0.1]]).into_dyn()),
    ));
    let checker = check(&mut table, CheckMode::FailFast);
    assert_eq!(checker.nb_severes(), 1);
    assert_eq!(
        checker.diagnostics()[0].message,
        "Invalid format for column 'VIS2ERR', found '2D' should be '3D'"
    );
}

#[test]
fn negative_errors_and_unknown_targets() {
    let mut table = vis2_table(3);
    for column in &mut table.columns {
        match (&column.name[..], &mut column.value) {
            ("VIS2ERR", ColumnValue::Double(a)) => a[[2, 0]] = -0.5,
            ("TARGET_ID", ColumnValue::Short(a)) => a[[1]] = 7,
            _ => {}
        }
    }
    let checker = check(&mut table, CheckMode::FailFast);
    let messages: Vec<_> = checker.diagnostics().iter().map(|d| d.message.as_str()).collect();
    assert_eq!(
        messages,
        [
            "Invalid value for column 'TARGET_ID' line 1, found '7' should be '1|2'",
            "Invalid value at index 0 for column 'VIS2ERR' line 2, found '-0.5' should be >= 0",
        ]
    );
}

#[test]
fn missing_members_and_bad_units() {
    let mut table = vis2_table(2);
    table.columns.retain(|c| c.name != "MJD");
    for column in &mut table.columns {
        match column.name.as_str() {
            "UCOORD" => column.unit = Some("deg".into()),
            "VCOORD" => column.unit = None,
            _ => {}
        }
    }
    table.header = header("OI_VIS2", &[("INSNAME", Value::String("PIONIER".into()))]);

    let checker = check(&mut table, CheckMode::FailFast);
    for rule in [
        Rule::KeywordMandatory,
        Rule::KeywordValAcceptedStr,
        Rule::ColMandatory,
        Rule::ColUnit,
        Rule::ColUnitExist,
    ] {
        assert!(checker.has_rule(rule), "{rule} missing from\n{}", checker.report());
    }
    assert_eq!(checker.nb_warnings(), 2);
    assert_eq!(checker.nb_severes(), 3);
    assert!(checker
        .diagnostics()
        .iter()
        .any(|d| d.message == "Missing keyword 'DATE-OBS'"));
}

#[test]
fn bad_revision_and_row_count() {
    let mut table = vis2_table(2);
    table.header.set("OI_REVN", Value::Integer(3), None);
    table.nb_rows = 5;
    let checker = check(&mut table, CheckMode::FailFast);
    assert!(checker
        .diagnostics()
        .iter()
        .any(|d| d.message == "Invalid value for keyword 'OI_REVN', found '3' should be '1|2'"));
    assert!(checker.has_rule(Rule::ColNbRows));
    assert!(checker
        .diagnostics()
        .iter()
        .all(|d| d.severity == Severity::Severe));
}

#[test]
fn audit_mode_covers_all_members() {
    let checker = check(&mut vis2_table(2), CheckMode::Audit);
    assert_eq!(checker.nb_severes(), 0);
    // One "can't check repeat" warning per column checked.
    assert_eq!(checker.nb_warnings(), 17);
    let rules = checker.rules();
    assert!(rules[&Rule::ColValPositive].contains("OI_VIS2.VIS2ERR"));
    assert!(rules[&Rule::ColValPositive].contains("OI_WAVELENGTH.EFF_WAVE"));
    assert!(rules[&Rule::ColValAcceptedInt].contains("OI_VIS2.TARGET_ID"));
    assert!(rules[&Rule::KeywordValAcceptedStr].contains("OI_VIS2.INSNAME"));
    assert!(rules[&Rule::ColUnit].contains("OI_VIS2.UCOORD"));
}

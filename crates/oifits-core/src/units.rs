//! Physical units of FITS keywords and columns.
//!
//! Each unit may name a reference unit it converts to with a single linear
//! factor (or, for frequencies, through the speed of light). There is no
//! general unit algebra: a unit converts to its reference and nothing else.

use std::fmt;

use crate::error::{Error, Result};

/// Speed of light in vacuum (m/s).
pub const C_LIGHT: f64 = 2.997_924_58e8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    NoUnit,
    Radian,
    Degree,
    Arcmin,
    Arcsec,
    Meter,
    Micrometer,
    Nanometer,
    Hertz,
    Kilohertz,
    Megahertz,
    Gigahertz,
    Second,
    Day,
    Year,
    Hour,
    MeterPerSecond,
    DegreePerYear,
}

/// How a unit reaches its reference.
enum Conversion {
    /// `reference = factor * value`
    Linear(f64),
    /// `reference = C / (value * scale)`
    Frequency(f64),
}

impl Unit {
    pub const ALL: [Unit; 18] = [
        Unit::NoUnit,
        Unit::Radian,
        Unit::Degree,
        Unit::Arcmin,
        Unit::Arcsec,
        Unit::Meter,
        Unit::Micrometer,
        Unit::Nanometer,
        Unit::Hertz,
        Unit::Kilohertz,
        Unit::Megahertz,
        Unit::Gigahertz,
        Unit::Second,
        Unit::Day,
        Unit::Year,
        Unit::Hour,
        Unit::MeterPerSecond,
        Unit::DegreePerYear,
    ];

    /// Accepted spellings; the first one is the standard name.
    pub fn tokens(self) -> &'static [&'static str] {
        match self {
            Unit::NoUnit => &[""],
            Unit::Radian => &["rad", "radian", "radians"],
            Unit::Degree => &["deg", "degree", "degrees"],
            Unit::Arcmin => &["arcmin", "arcmins"],
            Unit::Arcsec => &["arcsec", "arcsecs"],
            Unit::Meter => &["m", "meter", "meters"],
            Unit::Micrometer => &["micron", "microns", "micrometer", "micrometers"],
            Unit::Nanometer => &["nm", "nanometer", "nanometers"],
            Unit::Hertz => &["hz", "hertz"],
            Unit::Kilohertz => &["khz", "kilohertz"],
            Unit::Megahertz => &["mhz", "megahertz"],
            Unit::Gigahertz => &["ghz", "gigahertz"],
            Unit::Second => &["s", "sec", "second", "seconds"],
            Unit::Day => &["day", "days"],
            Unit::Year => &["yr", "year", "years"],
            Unit::Hour => &["h", "hour", "hours"],
            Unit::MeterPerSecond => &[
                "m/s",
                "m / s",
                "meter per second",
                "meters per second",
                "meter/second",
                "meters/second",
            ],
            Unit::DegreePerYear => &[
                "deg/yr",
                "deg / yr",
                "degree/yr",
                "degrees/yr",
                "deg/year",
                "degrees/year",
            ],
        }
    }

    pub fn standard_name(self) -> &'static str {
        self.tokens()[0]
    }

    /// Parse a unit token, ignoring case and surrounding blanks. An empty
    /// token means [`Unit::NoUnit`].
    pub fn parse(token: &str) -> Result<Unit> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(Unit::NoUnit);
        }
        Unit::ALL
            .into_iter()
            .find(|u| u.tokens().iter().any(|t| t.eq_ignore_ascii_case(token)))
            .ok_or_else(|| Error::UnsupportedUnit(token.to_string()))
    }

    /// Parse an optional token (a missing CUNITn keyword).
    pub fn parse_opt(token: Option<&str>) -> Result<Unit> {
        token.map_or(Ok(Unit::NoUnit), Unit::parse)
    }

    pub fn reference(self) -> Option<Unit> {
        match self {
            Unit::Degree | Unit::Arcmin | Unit::Arcsec => Some(Unit::Radian),
            Unit::Micrometer
            | Unit::Nanometer
            | Unit::Hertz
            | Unit::Kilohertz
            | Unit::Megahertz
            | Unit::Gigahertz => Some(Unit::Meter),
            _ => None,
        }
    }

    fn conversion(self) -> Option<Conversion> {
        let deg = std::f64::consts::PI / 180.0;
        Some(match self {
            Unit::Degree => Conversion::Linear(deg),
            Unit::Arcmin => Conversion::Linear(deg / 60.0),
            Unit::Arcsec => Conversion::Linear(deg / 3600.0),
            Unit::Micrometer => Conversion::Linear(1e-6),
            Unit::Nanometer => Conversion::Linear(1e-9),
            Unit::Hertz => Conversion::Frequency(1.0),
            Unit::Kilohertz => Conversion::Frequency(1e3),
            Unit::Megahertz => Conversion::Frequency(1e6),
            Unit::Gigahertz => Conversion::Frequency(1e9),
            _ => return None,
        })
    }

    /// Convert `value` from this unit into `target`.
    ///
    /// A unit without reference only "converts" to itself. A unit with a
    /// reference converts to that reference only.
    pub fn convert(self, value: f64, target: Unit) -> Result<f64> {
        let illegal = || Error::IllegalConversion {
            from: self.to_string(),
            to: target.to_string(),
        };
        match (self.reference(), self.conversion()) {
            (Some(reference), Some(conversion)) if reference == target => Ok(match conversion {
                Conversion::Linear(factor) => factor * value,
                Conversion::Frequency(scale) => C_LIGHT / (value * scale),
            }),
            (None, _) if target == self => Ok(value),
            _ => Err(illegal()),
        }
    }

    /// Convert to `canonical` when this unit is declared, pass the value
    /// through when no unit is declared.
    pub fn to_canonical(self, value: f64, canonical: Unit) -> Result<f64> {
        match self {
            Unit::NoUnit => Ok(value),
            u if u == canonical => Ok(value),
            u => u.convert(value, canonical),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::NoUnit => f.write_str("no unit"),
            u => f.write_str(u.standard_name()),
        }
    }
}

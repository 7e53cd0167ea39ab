//! FITS table cell types and their binary-table wire codes.

use std::any::{type_name, TypeId};
use std::fmt;

use crate::error::{Error, Result};

/// Primitive kind of a keyword value or column cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Char,
    Short,
    Int,
    Real,
    Double,
    Logical,
    Complex,
}

impl CellType {
    pub const ALL: [CellType; 7] = [
        CellType::Char,
        CellType::Short,
        CellType::Int,
        CellType::Real,
        CellType::Double,
        CellType::Logical,
        CellType::Complex,
    ];

    /// TFORM letter of the type.
    pub fn code(self) -> char {
        match self {
            CellType::Char => 'A',
            CellType::Short => 'I',
            CellType::Int => 'J',
            CellType::Real => 'E',
            CellType::Double => 'D',
            CellType::Logical => 'L',
            CellType::Complex => 'C',
        }
    }

    pub fn from_code(code: char) -> Option<CellType> {
        CellType::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Map a Rust element type to its cell type. Complex cells have no scalar
    /// Rust type and are recognized from array shape instead.
    pub fn of<T: 'static>() -> Result<CellType> {
        let id = TypeId::of::<T>();
        let table = [
            (TypeId::of::<String>(), CellType::Char),
            (TypeId::of::<&'static str>(), CellType::Char),
            (TypeId::of::<i16>(), CellType::Short),
            (TypeId::of::<i32>(), CellType::Int),
            (TypeId::of::<f32>(), CellType::Real),
            (TypeId::of::<f64>(), CellType::Double),
            (TypeId::of::<bool>(), CellType::Logical),
        ];
        table
            .into_iter()
            .find(|(t, _)| *t == id)
            .map(|(_, cell)| cell)
            .ok_or(Error::UnsupportedType(type_name::<T>()))
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, CellType::Char | CellType::Logical)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_bijective() {
        for t in CellType::ALL {
            assert_eq!(CellType::from_code(t.code()), Some(t));
        }
        assert_eq!(CellType::from_code('X'), None);
    }

    #[test]
    fn rust_types_map_to_cells() {
        assert_eq!(CellType::of::<String>().unwrap(), CellType::Char);
        assert_eq!(CellType::of::<i16>().unwrap(), CellType::Short);
        assert_eq!(CellType::of::<i32>().unwrap(), CellType::Int);
        assert_eq!(CellType::of::<f32>().unwrap(), CellType::Real);
        assert_eq!(CellType::of::<f64>().unwrap(), CellType::Double);
        assert_eq!(CellType::of::<bool>().unwrap(), CellType::Logical);
    }

    #[test]
    fn unmapped_type_is_an_error() {
        match CellType::of::<u64>() {
            Err(Error::UnsupportedType(name)) => assert_eq!(name, "u64"),
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn display_is_code() {
        assert_eq!(CellType::Double.to_string(), "D");
        assert!(CellType::Complex.is_numeric());
        assert!(!CellType::Char.is_numeric());
    }
}

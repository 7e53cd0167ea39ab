//! Declarative descriptors of the keywords and columns expected in a table.
//!
//! Descriptors are built once per table type and never mutated afterwards;
//! the same [`TableSchema`] can be shared read-only by any number of
//! validations running on different threads.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::types::CellType;
use crate::units::Unit;

/// Closed set of legal values for a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Accepted {
    #[default]
    Any,
    Integers(Vec<i16>),
    Strings(Vec<String>),
    /// Integers known only once the file is read (e.g. the TARGET_ID values of
    /// OI_TARGET), looked up by key in the validation context.
    IntegerReference(String),
    /// Strings known only once the file is read (e.g. INSNAME values).
    StringReference(String),
}

/// Numeric constraint on column values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataRange {
    /// Values are expected to be >= 0; advisory only.
    Positive,
    /// Values must be finite and >= 0. NaN marks a missing value and is
    /// accepted.
    PositiveStrict,
    /// Advisory bounds for display.
    Custom { min: f64, max: f64 },
}

/// Number of values per row of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cardinality {
    Fixed(u32),
    /// Equal to a count only known from another table (for instance NWAVE,
    /// the row count of the referenced OI_WAVELENGTH table).
    CrossReference(String),
}

/// Attributes shared by keyword and column descriptors.
#[derive(Debug, Clone)]
pub struct CellMeta {
    pub name: String,
    pub description: String,
    pub data_type: CellType,
    pub unit: Unit,
    pub optional: bool,
    pub accepted: Accepted,
}

impl CellMeta {
    fn new(name: &str, description: &str, data_type: CellType) -> Self {
        CellMeta {
            name: name.to_string(),
            description: description.to_string(),
            data_type,
            unit: Unit::NoUnit,
            optional: false,
            accepted: Accepted::Any,
        }
    }

    /// True if `token` parses to the declared unit.
    pub fn check_unit(&self, token: &str) -> bool {
        Unit::parse(token).is_ok_and(|u| u == self.unit)
    }
}

/// Render accepted values the way diagnostics show them: `1|2|3`.
pub fn join_accepted<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

// ── Keywords ──

#[derive(Debug, Clone)]
pub struct KeywordDescriptor {
    pub meta: CellMeta,
}

impl KeywordDescriptor {
    pub fn new(name: &str, description: &str, data_type: CellType) -> Self {
        KeywordDescriptor {
            meta: CellMeta::new(name, description, data_type),
        }
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.meta.unit = unit;
        self
    }

    pub fn optional(mut self) -> Self {
        self.meta.optional = true;
        self
    }

    pub fn accepted(mut self, accepted: Accepted) -> Self {
        self.meta.accepted = accepted;
        self
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }
}

// ── Columns ──

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub meta: CellMeta,
    pub cardinality: Cardinality,
    /// Declared as an array even when the repeat is 1.
    pub array_only: bool,
    /// Each value is a matrix (complex pairs or a square boolean map).
    pub is_3d: bool,
    /// Name of the column holding the errors of this one.
    pub error_column: Option<String>,
    pub data_range: Option<DataRange>,
    pub alias: Option<String>,
}

impl ColumnDescriptor {
    /// Scalar column (repeat 1).
    pub fn new(name: &str, description: &str, data_type: CellType) -> Self {
        ColumnDescriptor {
            meta: CellMeta::new(name, description, data_type),
            cardinality: Cardinality::Fixed(1),
            array_only: false,
            is_3d: false,
            error_column: None,
            data_range: None,
            alias: None,
        }
    }

    /// Fixed repeat; for character columns this is the maximum string length.
    pub fn repeat(mut self, repeat: u32) -> Self {
        self.cardinality = Cardinality::Fixed(repeat);
        self
    }

    /// Repeat resolved at validation time from `key`.
    pub fn repeat_from(mut self, key: &str) -> Self {
        self.cardinality = Cardinality::CrossReference(key.to_string());
        self.array_only = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.array_only = true;
        self
    }

    pub fn three_d(mut self) -> Self {
        self.is_3d = true;
        self.array_only = true;
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.meta.unit = unit;
        self
    }

    pub fn optional(mut self) -> Self {
        self.meta.optional = true;
        self
    }

    pub fn accepted(mut self, accepted: Accepted) -> Self {
        self.meta.accepted = accepted;
        self
    }

    pub fn error_column(mut self, name: &str) -> Self {
        self.error_column = Some(name.to_string());
        self
    }

    pub fn range(mut self, range: DataRange) -> Self {
        self.data_range = Some(range);
        self
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Statically known repeat, or `None` for a cross-referenced cardinality.
    pub fn fixed_repeat(&self) -> Option<u32> {
        match self.cardinality {
            Cardinality::Fixed(n) => Some(n),
            Cardinality::CrossReference(_) => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.meta.data_type != CellType::Char
            && (self.array_only || self.fixed_repeat().is_some_and(|n| n > 1))
    }

    pub fn is_3d(&self) -> bool {
        self.is_3d
    }
}

impl PartialEq for ColumnDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.meta.name == other.meta.name
    }
}

impl Eq for ColumnDescriptor {}

impl Hash for ColumnDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.name.hash(state);
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repeat = match &self.cardinality {
            Cardinality::Fixed(n) => n.to_string(),
            Cardinality::CrossReference(key) => key.clone(),
        };
        write!(f, "COLUMN '{}' [{} {}]", self.meta.name, repeat, self.meta.data_type)?;
        if self.meta.unit != Unit::NoUnit {
            write!(f, " ({})", self.meta.unit)?;
        }
        Ok(())
    }
}

impl fmt::Display for KeywordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEYWORD '{}' [1 {}]", self.meta.name, self.meta.data_type)?;
        if self.meta.unit != Unit::NoUnit {
            write!(f, " ({})", self.meta.unit)?;
        }
        Ok(())
    }
}

// ── Table schema ──

/// The descriptor set of one extension type.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub extname: String,
    keywords: Vec<KeywordDescriptor>,
    columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn new(extname: &str) -> Self {
        TableSchema {
            extname: extname.to_string(),
            ..Default::default()
        }
    }

    /// Add a keyword, replacing any descriptor with the same name.
    pub fn keyword(mut self, keyword: KeywordDescriptor) -> Self {
        self.keywords.retain(|k| k.name() != keyword.name());
        self.keywords.push(keyword);
        self
    }

    /// Add a column, replacing any descriptor with the same name.
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.retain(|c| c != &column);
        self.columns.push(column);
        self
    }

    pub fn keywords(&self) -> &[KeywordDescriptor] {
        &self.keywords
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn keyword_named(&self, name: &str) -> Option<&KeywordDescriptor> {
        self.keywords.iter().find(|k| k.name() == name)
    }

    /// Column by name, falling back to aliases.
    pub fn column_named(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .or_else(|| self.columns.iter().find(|c| c.alias.as_deref() == Some(name)))
    }
}

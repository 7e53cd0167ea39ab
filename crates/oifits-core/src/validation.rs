//! Schema validation of keywords and table columns.
//!
//! Checks never fail: every violation lands in a [`Checker`] as a graded
//! [`Diagnostic`] and the caller decides what a severe error means for the
//! data downstream.

use std::any::{type_name, Any};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use ndarray::ArrayD;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::schema::{
    join_accepted, Accepted, Cardinality, ColumnDescriptor, DataRange, KeywordDescriptor,
    TableSchema,
};
use crate::types::CellType;
use crate::units::Unit;
use crate::value::Value;

/// Stable identifiers of the checks performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rule {
    ColDim,
    ColFormat,
    ColMandatory,
    ColNbRows,
    ColUnit,
    ColUnitExist,
    ColValAcceptedInt,
    ColValAcceptedStr,
    ColValPositive,
    KeywordFormat,
    KeywordMandatory,
    KeywordValAcceptedInt,
    KeywordValAcceptedStr,
}

impl Rule {
    pub const ALL: [Rule; 13] = [
        Rule::ColDim,
        Rule::ColFormat,
        Rule::ColMandatory,
        Rule::ColNbRows,
        Rule::ColUnit,
        Rule::ColUnitExist,
        Rule::ColValAcceptedInt,
        Rule::ColValAcceptedStr,
        Rule::ColValPositive,
        Rule::KeywordFormat,
        Rule::KeywordMandatory,
        Rule::KeywordValAcceptedInt,
        Rule::KeywordValAcceptedStr,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Rule::ColDim => "GENERIC_COL_DIM",
            Rule::ColFormat => "GENERIC_COL_FORMAT",
            Rule::ColMandatory => "GENERIC_COL_MANDATORY",
            Rule::ColNbRows => "GENERIC_COL_NBROWS",
            Rule::ColUnit => "GENERIC_COL_UNIT",
            Rule::ColUnitExist => "GENERIC_COL_UNIT_EXIST",
            Rule::ColValAcceptedInt => "GENERIC_COL_VAL_ACCEPTED_INT",
            Rule::ColValAcceptedStr => "GENERIC_COL_VAL_ACCEPTED_STR",
            Rule::ColValPositive => "GENERIC_COL_VAL_POSITIVE",
            Rule::KeywordFormat => "GENERIC_KEYWORD_FORMAT",
            Rule::KeywordMandatory => "GENERIC_KEYWORD_MANDATORY",
            Rule::KeywordValAcceptedInt => "GENERIC_KEYWORD_VAL_ACCEPTED_INT",
            Rule::KeywordValAcceptedStr => "GENERIC_KEYWORD_VAL_ACCEPTED_STR",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Rule::ColDim => "check if the column dimension is known",
            Rule::ColFormat => "check if the column format matches the expected format",
            Rule::ColMandatory => "check if the required column is present",
            Rule::ColNbRows => "check if the column length matches the expected number of rows",
            Rule::ColUnit => "check if the column unit matches the expected unit",
            Rule::ColUnitExist => "check if the column unit exists",
            Rule::ColValAcceptedInt => "check if column values match the accepted integer values",
            Rule::ColValAcceptedStr => "check if column values match the accepted string values",
            Rule::ColValPositive => "check if column values are finite and positive",
            Rule::KeywordFormat => "check if the keyword format matches the expected format",
            Rule::KeywordMandatory => "check if the required keyword is present",
            Rule::KeywordValAcceptedInt => "check if the keyword value matches the accepted integer values",
            Rule::KeywordValAcceptedStr => "check if the keyword value matches the accepted string values",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Severe => "SEVERE",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub rule: Option<Rule>,
    /// `EXTNAME.MEMBER` the diagnostic refers to, if any.
    pub apply_to: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.severity, self.message)
    }
}

/// How eagerly rules are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckMode {
    /// Only violations are recorded.
    #[default]
    FailFast,
    /// Every rule is recorded against every member it is evaluated on, even
    /// when the member passes. Used to document rule coverage.
    Audit,
}

/// Diagnostics sink shared by all checks of one validation run.
#[derive(Debug, Default)]
pub struct Checker {
    mode: CheckMode,
    diagnostics: Vec<Diagnostic>,
    rules: BTreeMap<Rule, BTreeSet<String>>,
}

impl Checker {
    pub fn new(mode: CheckMode) -> Self {
        Checker {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> CheckMode {
        self.mode
    }

    pub fn is_audit(&self) -> bool {
        self.mode == CheckMode::Audit
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Info,
            rule: None,
            apply_to: None,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, rule: Rule, apply_to: &str, message: impl Into<String>) {
        self.push(Severity::Warning, rule, apply_to, message.into());
    }

    pub fn severe(&mut self, rule: Rule, apply_to: &str, message: impl Into<String>) {
        self.push(Severity::Severe, rule, apply_to, message.into());
    }

    /// Record that `rule` was evaluated on `apply_to`. No-op outside audit
    /// mode; violations are recorded by [`Checker::warning`] and
    /// [`Checker::severe`] in every mode.
    pub fn inspect(&mut self, rule: Rule, apply_to: &str) {
        if self.is_audit() {
            self.record(rule, apply_to);
        }
    }

    fn push(&mut self, severity: Severity, rule: Rule, apply_to: &str, message: String) {
        log::debug!("{severity} [{rule}] {message}");
        self.record(rule, apply_to);
        self.diagnostics.push(Diagnostic {
            severity,
            rule: Some(rule),
            apply_to: Some(apply_to.to_string()),
            message,
        });
    }

    fn record(&mut self, rule: Rule, apply_to: &str) {
        self.rules
            .entry(rule)
            .or_default()
            .insert(apply_to.to_string());
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Members each rule fired on (or was evaluated on, in audit mode).
    pub fn rules(&self) -> &BTreeMap<Rule, BTreeSet<String>> {
        &self.rules
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn nb_warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn nb_severes(&self) -> usize {
        self.count(Severity::Severe)
    }

    pub fn has_rule(&self, rule: Rule) -> bool {
        self.diagnostics.iter().any(|d| d.rule == Some(rule))
    }

    pub fn status(&self) -> String {
        format!(
            "{} warnings, {} severe errors",
            self.nb_warnings(),
            self.nb_severes()
        )
    }

    /// One `LEVEL\tmessage` line per diagnostic.
    pub fn report(&self) -> String {
        self.diagnostics
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.rules.clear();
    }
}

// ── Validation context ──

/// Values only known once a whole file has been read: cross-referenced
/// cardinalities and accepted values. Scoped to a single file.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    counts: HashMap<String, u32>,
    integers: HashMap<String, Vec<i16>>,
    strings: HashMap<String, Vec<String>>,
}

/// Accepted values after cross references are resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcceptedSet<'a> {
    Any,
    Integers(&'a [i16]),
    Strings(&'a [String]),
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_count(&mut self, key: &str, count: u32) {
        self.counts.insert(key.to_string(), count);
    }

    pub fn set_integers(&mut self, key: &str, values: Vec<i16>) {
        self.integers.insert(key.to_string(), values);
    }

    pub fn set_strings(&mut self, key: &str, values: Vec<String>) {
        self.strings.insert(key.to_string(), values);
    }

    /// Resolved count for `key`, 0 when it cannot be resolved.
    pub fn count(&self, key: &str) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Expected repeat of a column; 0 means unknown.
    pub fn repeat_of(&self, column: &ColumnDescriptor) -> u32 {
        match &column.cardinality {
            Cardinality::Fixed(n) => *n,
            Cardinality::CrossReference(key) => self.count(key),
        }
    }

    pub fn resolve<'a>(&'a self, accepted: &'a Accepted) -> AcceptedSet<'a> {
        match accepted {
            Accepted::Any => AcceptedSet::Any,
            Accepted::Integers(v) if !v.is_empty() => AcceptedSet::Integers(v),
            Accepted::Strings(v) if !v.is_empty() => AcceptedSet::Strings(v),
            Accepted::IntegerReference(key) => match self.integers.get(key) {
                Some(v) if !v.is_empty() => AcceptedSet::Integers(v),
                _ => {
                    log::debug!("no accepted integers resolved for '{key}'");
                    AcceptedSet::Any
                }
            },
            Accepted::StringReference(key) => match self.strings.get(key) {
                Some(v) if !v.is_empty() => AcceptedSet::Strings(v),
                _ => {
                    log::debug!("no accepted strings resolved for '{key}'");
                    AcceptedSet::Any
                }
            },
            _ => AcceptedSet::Any,
        }
    }
}

// ── Column values ──

/// In-memory column content. Dimension 0 is the row.
///
/// Undefined integers are stored as the FITS convention values `i16::MIN`
/// and `i32::MIN`; undefined floats are NaN; undefined strings are `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Char(Vec<Option<String>>),
    Short(ArrayD<i16>),
    Int(ArrayD<i32>),
    Real(ArrayD<f32>),
    Double(ArrayD<f64>),
    Logical(ArrayD<bool>),
}

pub const UNDEFINED_SHORT: i16 = i16::MIN;
pub const UNDEFINED_INT: i32 = i32::MIN;

/// Wire type, row count and repeat inferred from a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed {
    pub rows: usize,
    pub data_type: CellType,
    pub repeat: u32,
}

impl ColumnValue {
    /// Wrap a typed array, recognizing its element type at runtime.
    pub fn from_array<T: Clone + 'static>(array: ArrayD<T>) -> Result<ColumnValue> {
        let unsupported = || Error::UnsupportedType(type_name::<T>());
        let cell = CellType::of::<T>()?;
        let any: Box<dyn Any> = Box::new(array);
        let value = match cell {
            CellType::Short => any.downcast::<ArrayD<i16>>().map(|a| ColumnValue::Short(*a)),
            CellType::Int => any.downcast::<ArrayD<i32>>().map(|a| ColumnValue::Int(*a)),
            CellType::Real => any.downcast::<ArrayD<f32>>().map(|a| ColumnValue::Real(*a)),
            CellType::Double => any.downcast::<ArrayD<f64>>().map(|a| ColumnValue::Double(*a)),
            CellType::Logical => any.downcast::<ArrayD<bool>>().map(|a| ColumnValue::Logical(*a)),
            CellType::Char => match any.downcast::<ArrayD<String>>() {
                Ok(a) => Ok(ColumnValue::Char(a.into_iter().map(Some).collect())),
                Err(any) => any
                    .downcast::<ArrayD<&'static str>>()
                    .map(|a| ColumnValue::Char(a.iter().map(|s| Some(s.to_string())).collect())),
            },
            CellType::Complex => return Err(unsupported()),
        };
        value.map_err(|_| unsupported())
    }

    /// Character column from optional strings.
    pub fn strings<S: Into<String>>(rows: impl IntoIterator<Item = Option<S>>) -> ColumnValue {
        ColumnValue::Char(rows.into_iter().map(|s| s.map(Into::into)).collect())
    }

    /// Infer the observed shape. Null strings are repaired to empty ones.
    /// Returns `None` for a 3-D shape that is neither complex pairs nor a
    /// square boolean map.
    pub fn observe(&mut self) -> Option<Observed> {
        match self {
            ColumnValue::Char(rows) => {
                let mut repeat = 0;
                for row in rows.iter_mut() {
                    let s = row.get_or_insert_with(String::new);
                    repeat = repeat.max(s.len());
                }
                Some(Observed {
                    rows: rows.len(),
                    data_type: CellType::Char,
                    repeat: repeat as u32,
                })
            }
            ColumnValue::Short(a) => observe_shape(a.shape(), CellType::Short),
            ColumnValue::Int(a) => observe_shape(a.shape(), CellType::Int),
            ColumnValue::Real(a) => observe_shape(a.shape(), CellType::Real),
            ColumnValue::Double(a) => observe_shape(a.shape(), CellType::Double),
            ColumnValue::Logical(a) => observe_shape(a.shape(), CellType::Logical),
        }
    }
}

fn observe_shape(shape: &[usize], data_type: CellType) -> Option<Observed> {
    let rows = shape.first().copied().unwrap_or(1);
    let (data_type, repeat) = match shape.len() {
        0 | 1 => (data_type, 1),
        2 => (data_type, shape[1]),
        3 if data_type == CellType::Real && shape[2] == 2 => (CellType::Complex, shape[1]),
        3 if data_type == CellType::Logical && shape[1] == shape[2] => (data_type, shape[1]),
        _ => return None,
    };
    Some(Observed {
        rows,
        data_type,
        repeat: repeat as u32,
    })
}

// ── Checks ──

fn member(extname: &str, name: &str) -> String {
    format!("{extname}.{name}")
}

/// Check a column value against its descriptor.
pub fn check_column(
    column: &ColumnDescriptor,
    value: &mut ColumnValue,
    nb_rows: usize,
    context: &ValidationContext,
    checker: &mut Checker,
    extname: &str,
) {
    let name = column.name();
    let apply_to = member(extname, name);

    let Some(observed) = value.observe() else {
        log::error!("unsupported 3-D shape for column '{name}'");
        return;
    };

    checker.inspect(Rule::ColNbRows, &apply_to);
    if observed.rows != nb_rows {
        checker.severe(
            Rule::ColNbRows,
            &apply_to,
            format!(
                "Invalid length for column '{name}', found {} row(s) should be {nb_rows} row(s)",
                observed.rows
            ),
        );
    }

    let expected_type = column.meta.data_type;
    let expected_repeat = context.repeat_of(column);
    let type_ok = observed.data_type == expected_type;
    let found = format!("{}{}", observed.repeat, observed.data_type);

    checker.inspect(Rule::ColFormat, &apply_to);
    if expected_repeat == 0 || checker.is_audit() {
        checker.inspect(Rule::ColDim, &apply_to);
        checker.warning(
            Rule::ColDim,
            &apply_to,
            format!("Can't check repeat for column '{name}'"),
        );
        if !type_ok {
            checker.severe(
                Rule::ColFormat,
                &apply_to,
                format!("Invalid format for column '{name}', found '{}' should be '{expected_type}'", observed.data_type),
            );
        }
    } else {
        let repeat_ok = if expected_type == CellType::Char {
            observed.repeat <= expected_repeat
        } else {
            observed.repeat == expected_repeat
        };
        if !type_ok || !repeat_ok {
            checker.severe(
                Rule::ColFormat,
                &apply_to,
                format!(
                    "Invalid format for column '{name}', found '{found}' should be '{expected_repeat}{expected_type}'"
                ),
            );
        }
    }

    match (context.resolve(&column.meta.accepted), &*value) {
        (AcceptedSet::Integers(accepted), ColumnValue::Short(a)) => {
            checker.inspect(Rule::ColValAcceptedInt, &apply_to);
            check_accepted_ints(a, UNDEFINED_SHORT, accepted, name, &apply_to, checker);
        }
        (AcceptedSet::Integers(accepted), ColumnValue::Int(a)) => {
            checker.inspect(Rule::ColValAcceptedInt, &apply_to);
            check_accepted_ints(a, UNDEFINED_INT, accepted, name, &apply_to, checker);
        }
        (AcceptedSet::Integers(_), _) => {}
        (AcceptedSet::Strings(accepted), ColumnValue::Char(rows)) => {
            checker.inspect(Rule::ColValAcceptedStr, &apply_to);
            for (line, row) in rows.iter().enumerate() {
                let found = row.as_deref().unwrap_or("").trim();
                if !accepted.iter().any(|a| a.trim() == found) {
                    checker.severe(
                        Rule::ColValAcceptedStr,
                        &apply_to,
                        format!(
                            "Invalid value for column '{name}' line {line}, found '{found}' should be '{}'",
                            join_accepted(accepted)
                        ),
                    );
                }
            }
        }
        (AcceptedSet::Strings(_), _) => {}
        (AcceptedSet::Any, value) => {
            if column.data_range == Some(DataRange::PositiveStrict) {
                match value {
                    ColumnValue::Real(a) => {
                        checker.inspect(Rule::ColValPositive, &apply_to);
                        check_positive(a, name, &apply_to, checker);
                    }
                    ColumnValue::Double(a) => {
                        checker.inspect(Rule::ColValPositive, &apply_to);
                        check_positive(a, name, &apply_to, checker);
                    }
                    _ => {}
                }
            }
        }
    }
}

fn check_accepted_ints<T>(
    array: &ArrayD<T>,
    undefined: T,
    accepted: &[i16],
    name: &str,
    apply_to: &str,
    checker: &mut Checker,
) where
    T: Copy + PartialEq + Into<i64> + fmt::Display,
{
    for (line, row) in array.outer_iter().enumerate() {
        let single = row.len() == 1;
        for (index, &v) in row.iter().enumerate() {
            if v == undefined || accepted.iter().any(|&a| i64::from(a) == v.into()) {
                continue;
            }
            let message = if single {
                format!(
                    "Invalid value for column '{name}' line {line}, found '{v}' should be '{}'",
                    join_accepted(accepted)
                )
            } else {
                format!(
                    "Invalid value at index {index} for column '{name}' line {line}, found '{v}' should be '{}'",
                    join_accepted(accepted)
                )
            };
            checker.severe(Rule::ColValAcceptedInt, apply_to, message);
        }
    }
}

/// Finite and non-negative, or NaN (a missing value).
fn check_positive<T>(array: &ArrayD<T>, name: &str, apply_to: &str, checker: &mut Checker)
where
    T: Copy + Into<f64> + fmt::Display,
{
    for (line, row) in array.outer_iter().enumerate() {
        let single = row.len() == 1;
        for (index, &v) in row.iter().enumerate() {
            let x: f64 = v.into();
            if x.is_nan() || (x.is_finite() && x >= 0.0) {
                continue;
            }
            let message = if single {
                format!("Invalid value for column '{name}' line {line}, found '{v}' should be >= 0")
            } else {
                format!(
                    "Invalid value at index {index} for column '{name}' line {line}, found '{v}' should be >= 0"
                )
            };
            checker.severe(Rule::ColValPositive, apply_to, message);
        }
    }
}

/// Cell type a header value is written as.
fn keyword_type(value: &Value) -> CellType {
    match value {
        Value::Logical(_) => CellType::Logical,
        Value::Integer(_) => CellType::Int,
        Value::Float(_) => CellType::Double,
        Value::String(_) => CellType::Char,
        Value::Complex(..) => CellType::Complex,
    }
}

/// Header values carry no width, so narrower declared types accept the
/// wider parsed one and floating types accept integer literals.
fn keyword_type_matches(declared: CellType, found: CellType) -> bool {
    match declared {
        CellType::Short | CellType::Int => found == CellType::Int,
        CellType::Real | CellType::Double => {
            matches!(found, CellType::Double | CellType::Int)
        }
        other => other == found,
    }
}

/// Check a keyword value against its descriptor.
pub fn check_keyword(
    keyword: &KeywordDescriptor,
    value: &Value,
    context: &ValidationContext,
    checker: &mut Checker,
    extname: &str,
) {
    let name = keyword.name();
    let apply_to = member(extname, name);
    let declared = keyword.meta.data_type;
    let found = keyword_type(value);
    let type_ok = keyword_type_matches(declared, found);

    checker.inspect(Rule::KeywordFormat, &apply_to);
    if !type_ok {
        checker.severe(
            Rule::KeywordFormat,
            &apply_to,
            format!("Invalid format for keyword '{name}', found '{found}' should be '{declared}'"),
        );
    }
    if !type_ok && !checker.is_audit() {
        return;
    }

    match context.resolve(&keyword.meta.accepted) {
        AcceptedSet::Integers(accepted) => {
            checker.inspect(Rule::KeywordValAcceptedInt, &apply_to);
            let ok = value
                .as_i64()
                .is_some_and(|v| accepted.iter().any(|&a| i64::from(a) == v));
            if !ok {
                checker.severe(
                    Rule::KeywordValAcceptedInt,
                    &apply_to,
                    format!(
                        "Invalid value for keyword '{name}', found '{}' should be '{}'",
                        raw_display(value),
                        join_accepted(accepted)
                    ),
                );
            }
        }
        AcceptedSet::Strings(accepted) => {
            checker.inspect(Rule::KeywordValAcceptedStr, &apply_to);
            let found = value.as_str().map(str::trim);
            let ok = found.is_some_and(|v| accepted.iter().any(|a| a.trim() == v));
            if !ok {
                checker.severe(
                    Rule::KeywordValAcceptedStr,
                    &apply_to,
                    format!(
                        "Invalid value for keyword '{name}', found '{}' should be '{}'",
                        raw_display(value),
                        join_accepted(accepted)
                    ),
                );
            }
        }
        AcceptedSet::Any => {}
    }
}

fn raw_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Check every keyword descriptor of `schema` against `header`.
pub fn check_header(
    schema: &TableSchema,
    header: &Header,
    context: &ValidationContext,
    checker: &mut Checker,
) {
    for keyword in schema.keywords() {
        let apply_to = member(&schema.extname, keyword.name());
        checker.inspect(Rule::KeywordMandatory, &apply_to);
        match header.value(keyword.name()) {
            Some(value) => check_keyword(keyword, value, context, checker, &schema.extname),
            None if keyword.meta.optional => {}
            None => checker.severe(
                Rule::KeywordMandatory,
                &apply_to,
                format!("Missing keyword '{}'", keyword.name()),
            ),
        }
    }
}

/// A named column of a loaded table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Raw TUNITn token.
    pub unit: Option<String>,
    pub value: ColumnValue,
}

impl Column {
    pub fn new(name: &str, unit: Option<&str>, value: ColumnValue) -> Self {
        Column {
            name: name.to_string(),
            unit: unit.map(str::to_string),
            value,
        }
    }
}

/// A loaded binary table: its header and columns.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub extname: String,
    pub header: Header,
    pub nb_rows: usize,
    pub columns: Vec<Column>,
}

impl TableData {
    pub fn new(extname: &str, header: Header, nb_rows: usize) -> Self {
        TableData {
            extname: extname.to_string(),
            header,
            nb_rows,
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn position_of(&self, descriptor: &ColumnDescriptor) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name == descriptor.name())
            .or_else(|| {
                let alias = descriptor.alias.as_deref()?;
                self.columns.iter().position(|c| c.name == alias)
            })
    }
}

/// Validate a whole table: keywords, presence, units and values of columns.
pub fn check_table(
    table: &mut TableData,
    schema: &TableSchema,
    context: &ValidationContext,
    checker: &mut Checker,
) {
    log::debug!("checking table {}", schema.extname);
    check_header(schema, &table.header, context, checker);

    let extname = schema.extname.as_str();
    let nb_rows = table.nb_rows;
    for descriptor in schema.columns() {
        let apply_to = member(extname, descriptor.name());
        checker.inspect(Rule::ColMandatory, &apply_to);
        let Some(index) = table.position_of(descriptor) else {
            if !descriptor.meta.optional {
                checker.severe(
                    Rule::ColMandatory,
                    &apply_to,
                    format!("Missing column '{}'", descriptor.name()),
                );
            }
            continue;
        };
        let column = &mut table.columns[index];

        if descriptor.meta.unit != Unit::NoUnit {
            checker.inspect(Rule::ColUnitExist, &apply_to);
            match column.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                None => checker.warning(
                    Rule::ColUnitExist,
                    &apply_to,
                    format!(
                        "Missing unit for column '{}', should be '{}'",
                        descriptor.name(),
                        descriptor.meta.unit.standard_name()
                    ),
                ),
                Some(unit) => {
                    checker.inspect(Rule::ColUnit, &apply_to);
                    if !descriptor.meta.check_unit(unit) {
                        checker.warning(
                            Rule::ColUnit,
                            &apply_to,
                            format!(
                                "Invalid unit for column '{}', found '{unit}' should be '{}'",
                                descriptor.name(),
                                descriptor.meta.unit.standard_name()
                            ),
                        );
                    }
                }
            }
        }

        check_column(descriptor, &mut column.value, nb_rows, context, checker, extname);
    }
}

//! Raw tables as the DDL parser yields them, and the normalized form the
//! renderers work from.

use smallvec::SmallVec;
use tracing::debug;

use crate::error::GeneratorError;
use crate::types::{map_type, TypeConfig, ValueType};

/// Default expressions that are rendered as a Sequelize constant.
const CURRENT_TIMESTAMP: [&str; 2] = ["CURRENT_TIMESTAMP", "CURRENT_TIMESTAMP()"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawType {
    pub datatype: String,
    /// Storage width in bytes, integers only.
    pub width: Option<u8>,
    pub length: Option<u64>,
    pub digits: Option<u64>,
    pub decimals: Option<u64>,
}

impl RawType {
    pub fn new(datatype: impl Into<String>) -> Self {
        Self {
            datatype: datatype.into(),
            width: None,
            length: None,
            digits: None,
            decimals: None,
        }
    }

    pub fn width(mut self, width: u8) -> Self {
        self.width = Some(width);
        self
    }

    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn digits(mut self, digits: u64, decimals: u64) -> Self {
        self.digits = Some(digits);
        self.decimals = Some(decimals);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOptions {
    pub nullable: bool,
    /// Default literal, already in TypeScript lexical form.
    pub default: Option<String>,
    pub autoincrement: bool,
    pub unsigned: bool,
}

impl Default for RawOptions {
    fn default() -> Self {
        Self {
            nullable: true,
            default: None,
            autoincrement: false,
            unsigned: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub ty: RawType,
    pub options: RawOptions,
}

pub type RawColumnList = SmallVec<[RawColumn; 16]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub name: String,
    pub columns: RawColumnList,
    pub primary_key: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// `CURRENT_TIMESTAMP`, rendered as the `NOW` constant.
    Now,
    EmptyString,
    /// Trusted as a valid TypeScript token and emitted verbatim.
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub storage_type: String,
    pub value_type: ValueType,
    pub allow_null: bool,
    pub auto_increment: bool,
    pub default_value: Option<DefaultValue>,
    pub primary_key: bool,
}

impl Column {
    /// A required attribute must be supplied when a row is created.
    pub fn is_required(&self) -> bool {
        !self.allow_null && self.default_value.is_none() && !self.auto_increment
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

fn derive_default(raw: &str) -> DefaultValue {
    if CURRENT_TIMESTAMP
        .iter()
        .any(|now| raw.eq_ignore_ascii_case(now))
    {
        return DefaultValue::Now;
    }

    match raw {
        "" | "\"\"" | "''" => DefaultValue::EmptyString,
        _ => DefaultValue::Literal(raw.to_string()),
    }
}

pub fn derive_column(
    raw: &RawColumn,
    primary_key: &[String],
    config: &TypeConfig,
) -> Result<Column, GeneratorError> {
    let mapped = map_type(&raw.ty, raw.options.unsigned, config)?;
    Ok(Column {
        name: raw.name.clone(),
        storage_type: mapped.storage_type,
        value_type: mapped.value_type,
        allow_null: raw.options.nullable,
        auto_increment: raw.options.autoincrement,
        default_value: raw.options.default.as_deref().map(derive_default),
        primary_key: primary_key.iter().any(|key| *key == raw.name),
    })
}

/// Normalizes one table, reporting every column whose type can't be mapped.
pub fn normalize_table(raw: &RawTable, config: &TypeConfig) -> Result<Table, GeneratorError> {
    let mut columns = Vec::with_capacity(raw.columns.len());
    let mut errors = Vec::new();
    for column in &raw.columns {
        match derive_column(column, &raw.primary_key, config) {
            Ok(column) => columns.push(column),
            Err(err) => errors.push(GeneratorError::Column {
                table: raw.name.clone(),
                column: column.name.clone(),
                inner: Box::new(err),
            }),
        }
    }

    if let Some(err) = GeneratorError::from_many(errors) {
        return Err(err);
    }

    debug!(table = %raw.name, columns = columns.len(), "normalized table");
    Ok(Table {
        name: raw.name.clone(),
        columns,
    })
}

pub fn normalize_tables(raw: &[RawTable], config: &TypeConfig) -> Result<Vec<Table>, GeneratorError> {
    let mut tables = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();
    for table in raw {
        match normalize_table(table, config) {
            Ok(table) => tables.push(table),
            Err(GeneratorError::Multiple(many)) => errors.extend(many.0),
            Err(err) => errors.push(err),
        }
    }

    match GeneratorError::from_many(errors) {
        Some(err) => Err(err),
        None => Ok(tables),
    }
}

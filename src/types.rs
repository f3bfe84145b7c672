//! SQL column types to Sequelize `DataTypes` and TypeScript value types.

use std::fmt;

use crate::error::GeneratorError;
use crate::schema::RawType;

const UNSIGNED_SUFFIX: &str = ".UNSIGNED";

/// Policy knobs for the type mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeConfig {
    /// Expose DECIMAL columns as `string` so no precision is lost in a JS number.
    pub decimal_as_string: bool,
}

impl Default for TypeConfig {
    fn default() -> Self {
        Self {
            decimal_as_string: true,
        }
    }
}

/// TypeScript type of a model attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueType {
    Number,
    String,
    Date,
    Any,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Date => "Date",
            ValueType::Any => "any",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappedType {
    /// Expression following `DataTypes.` in a column definition.
    pub storage_type: String,
    pub value_type: ValueType,
}

impl MappedType {
    fn new(storage_type: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            storage_type: storage_type.into(),
            value_type,
        }
    }
}

fn unsigned_suffix(unsigned: bool) -> &'static str {
    if unsigned {
        return UNSIGNED_SUFFIX;
    }

    ""
}

fn sized(name: &str, size: Option<u64>) -> String {
    match size {
        Some(size) => format!("{name}({size})"),
        None => format!("{name}()"),
    }
}

/// Maps a column type. Every datatype tag the parser emits for a supported
/// SQL type has a mapping; anything else is an `UnsupportedType` error.
pub fn map_type(
    ty: &RawType,
    unsigned: bool,
    config: &TypeConfig,
) -> Result<MappedType, GeneratorError> {
    let suffix = unsigned_suffix(unsigned);
    let mapped = match ty.datatype.as_str() {
        "int" => {
            let name = match ty.width {
                Some(1) => "TINYINT",
                Some(8) => "BIGINT",
                _ => "INTEGER",
            };
            MappedType::new(format!("{name}(){suffix}"), ValueType::Number)
        }
        "decimal" => {
            let value_type = if config.decimal_as_string {
                ValueType::String
            } else {
                ValueType::Number
            };
            MappedType::new(
                format!(
                    "DECIMAL({}, {}){suffix}",
                    ty.digits.unwrap_or(10),
                    ty.decimals.unwrap_or(0)
                ),
                value_type,
            )
        }
        "float" => MappedType::new(format!("FLOAT(){suffix}"), ValueType::Number),
        "double" => MappedType::new(format!("DOUBLE(){suffix}"), ValueType::Number),
        "char" => MappedType::new(sized("CHAR", ty.length), ValueType::String),
        "varchar" => MappedType::new(sized("STRING", ty.length), ValueType::String),
        "text" => MappedType::new("TEXT()", ValueType::String),
        // DATETIME and TIMESTAMP are both a JS Date backed by DataTypes.DATE
        "datetime" | "timestamp" => MappedType::new("DATE()", ValueType::Date),
        "date" => MappedType::new("DATEONLY()", ValueType::Date),
        "json" => MappedType::new("JSON", ValueType::Any),
        other => {
            return Err(GeneratorError::UnsupportedType {
                datatype: other.to_string(),
            })
        }
    };

    Ok(mapped)
}

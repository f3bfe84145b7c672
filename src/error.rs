use std::path::PathBuf;

use sqlparser::parser::ParserError;
use thiserror::Error;

/// Number of lines kept from a syntax error before it is printed.
const SYNTAX_ERROR_LINES: usize = 4;

#[derive(Debug)]
pub struct MultipleGeneratorErrors(pub Vec<GeneratorError>);

impl std::fmt::Display for MultipleGeneratorErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            write!(f, "\t{}. {}", i + 1, item)?;
        }

        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("multiple:\n{0}")]
    Multiple(MultipleGeneratorErrors),

    #[error(transparent)]
    Parse(#[from] ParserError),

    #[error("in statement number {index}: {inner}")]
    Statement {
        index: usize,
        inner: Box<GeneratorError>,
    },

    #[error("in column '{table}.{column}': {inner}")]
    Column {
        table: String,
        column: String,
        inner: Box<GeneratorError>,
    },

    #[error("unsupported sql data type '{datatype}'")]
    UnsupportedType { datatype: String },

    #[error("unimplemented {0}")]
    Unimplemented(&'static str),

    #[error("table '{0}' doesn't exist")]
    TableNotExist(String),

    #[error("table '{0}' already exists")]
    DuplicateTable(String),

    #[error("column '{0}' doesn't exist")]
    ColumnNotExist(String),

    #[error("model of table '{table}' would overwrite '{}'", .path.display())]
    PathCollision { table: String, path: PathBuf },

    #[error("in '{}': {inner}", .path.display())]
    Region { path: PathBuf, inner: RegionError },

    #[error("{context} '{}'", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GeneratorError {
    /// Collapses a list of errors into a single one, `None` when empty.
    pub fn from_many(mut errors: Vec<GeneratorError>) -> Option<GeneratorError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(GeneratorError::Multiple(MultipleGeneratorErrors(errors))),
        }
    }

    /// Message printed when the schema can't be parsed. Syntax errors are cut
    /// down to their first lines, anything else is printed whole.
    pub fn diagnostic(&self) -> String {
        let message = self.to_string();
        if !self.is_syntax_error() {
            return message;
        }

        message
            .lines()
            .take(SYNTAX_ERROR_LINES)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_syntax_error(&self) -> bool {
        match self {
            GeneratorError::Parse(ParserError::ParserError(_))
            | GeneratorError::Parse(ParserError::TokenizerError(_)) => true,
            GeneratorError::Statement { inner, .. } => inner.is_syntax_error(),
            _ => false,
        }
    }
}

/// Inconsistent marker layout inside an existing generated file.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegionError {
    #[error("marker `{marker}` occurs more than once")]
    DuplicateMarker { marker: &'static str },

    #[error("region '{region}' ends before it begins")]
    EndBeforeBegin { region: &'static str },

    #[error("region '{first}' overlaps region '{second}'")]
    Overlap {
        first: &'static str,
        second: &'static str,
    },

    #[error("region '{region}' must come after region '{after}'")]
    OutOfOrder {
        region: &'static str,
        after: &'static str,
    },
}

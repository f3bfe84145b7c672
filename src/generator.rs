use std::path::Path;

use tracing::debug;

use crate::error::GeneratorError;
use crate::output::{self, Outcome};
use crate::schema::Table;

/// What a generation pass did to the output directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl Summary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Writes `index.ts` and one model file per table into `output`. Every file
/// is attempted; failures are reported together. A table whose model would
/// overwrite `index.ts` fails the pass before anything is written.
pub fn generate(tables: &[Table], output: &Path) -> Result<Summary, GeneratorError> {
    output::check_paths(output, tables)?;

    let mut summary = Summary::default();
    let mut errors = Vec::new();

    match output::write_index(output, tables) {
        Ok(outcome) => summary.record(outcome),
        Err(err) => errors.push(err),
    }

    for table in tables {
        debug!(table = %table.name, "writing model");
        match output::write_model(output, table) {
            Ok(outcome) => summary.record(outcome),
            Err(err) => errors.push(err),
        }
    }

    match GeneratorError::from_many(errors) {
        Some(err) => Err(err),
        None => Ok(summary),
    }
}

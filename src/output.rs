//! Writing generated files: a full render on first run, a region merge when
//! the file is already there.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::GeneratorError;
use crate::region::{self, Fragments, Region};
use crate::render::{self, EXTENSION};
use crate::schema::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

fn io_error(context: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> GeneratorError {
    let path = path.to_path_buf();
    move |source| GeneratorError::Io {
        context,
        path,
        source,
    }
}

pub fn create_dir(dir: &Path) -> Result<(), GeneratorError> {
    fs::create_dir_all(dir).map_err(io_error("creating directory", dir))
}

/// Mode of a model file written for the first time.
#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

/// Writes `contents` to `path` through a temporary file in the same directory,
/// so an interrupted run never leaves it half written.
fn write_atomic(
    path: &Path,
    contents: &str,
    permissions: Option<fs::Permissions>,
) -> Result<(), GeneratorError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file =
        NamedTempFile::new_in(dir).map_err(io_error("creating temporary file in", dir))?;
    file.write_all(contents.as_bytes())
        .map_err(io_error("writing", path))?;
    if let Some(permissions) = permissions {
        file.as_file()
            .set_permissions(permissions)
            .map_err(io_error("setting permissions of", path))?;
    }
    file.persist(path)
        .map_err(|err| io_error("replacing", path)(err.error))?;
    Ok(())
}

/// Writes `full()` when `path` is new, otherwise merges `fragments` into the
/// marked regions of the existing file.
pub fn write_or_merge(
    path: &Path,
    regions: &[Region],
    fragments: &Fragments,
    full: impl FnOnce() -> String,
) -> Result<Outcome, GeneratorError> {
    if !path.exists() {
        write_atomic(path, &full(), new_file_permissions())?;
        info!(path = %path.display(), "created");
        return Ok(Outcome::Created);
    }

    let existing = fs::read_to_string(path).map_err(io_error("reading", path))?;
    let merged = region::merge(regions, fragments, &existing).map_err(|inner| {
        GeneratorError::Region {
            path: path.to_path_buf(),
            inner,
        }
    })?;
    if merged == existing {
        debug!(path = %path.display(), "unchanged");
        return Ok(Outcome::Unchanged);
    }

    let permissions = fs::metadata(path)
        .map_err(io_error("reading metadata of", path))?
        .permissions();
    write_atomic(path, &merged, Some(permissions))?;
    info!(path = %path.display(), "updated");
    Ok(Outcome::Updated)
}

pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(format!("index.{EXTENSION}"))
}

pub fn model_path(dir: &Path, table: &Table) -> PathBuf {
    dir.join(format!("{}.{EXTENSION}", table.name))
}

/// Fails for every table whose model file would be the index file. File
/// names are compared ignoring ASCII case, as some filesystems do.
pub fn check_paths(dir: &Path, tables: &[Table]) -> Result<(), GeneratorError> {
    let index = index_path(dir);
    let errors = tables
        .iter()
        .filter(|table| {
            model_path(dir, table)
                .to_string_lossy()
                .eq_ignore_ascii_case(&index.to_string_lossy())
        })
        .map(|table| GeneratorError::PathCollision {
            table: table.name.clone(),
            path: index.clone(),
        })
        .collect();

    match GeneratorError::from_many(errors) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub fn write_index(dir: &Path, tables: &[Table]) -> Result<Outcome, GeneratorError> {
    write_or_merge(
        &index_path(dir),
        &region::INDEX_REGIONS,
        &render::index_fragments(tables),
        || render::index_file(tables),
    )
}

pub fn write_model(dir: &Path, table: &Table) -> Result<Outcome, GeneratorError> {
    write_or_merge(
        &model_path(dir, table),
        &region::MODEL_REGIONS,
        &render::model_fragments(table),
        || render::model_file(table),
    )
}

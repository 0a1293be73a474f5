//! Artifact naming and at-most-once production.
//!
//! An artifact is named `<configuration>_<command id with '_' for '.'><ext>`
//! and lives in the artifact directory. `run` never overwrites one; it has to
//! be cleaned first.

use crate::error::{CommandError, CommandResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base name shared by everything a command produces for a configuration.
pub fn artifact_base_name(configuration: &str, command_id: &str) -> String {
    format!("{}_{}", configuration, command_id.replace('.', "_"))
}

/// Artifact location of one command for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDir {
    dir: PathBuf,
    base_name: String,
}

impl ArtifactDir {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Path of the artifact with `extension` (including the leading dot).
    pub fn file(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.base_name, extension))
    }

    /// Path of the artifact without any extension.
    pub fn bare(&self) -> PathBuf {
        self.dir.join(&self.base_name)
    }

    /// Create the artifact directory if needed.
    pub fn ensure(&self, command: &str) -> CommandResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CommandError::io(command, e))
    }
}

/// Produce `path` unless it already exists.
///
/// An existing artifact short-circuits: `produce` is not called and the
/// existing path is returned. `produce` has to leave a file at `path`,
/// otherwise the result is `CommandError::MissingArtifact`.
pub fn produce_once<F>(command: &str, path: &Path, produce: F) -> CommandResult<PathBuf>
where
    F: FnOnce(&Path) -> CommandResult<()>,
{
    if path.is_file() {
        info!(
            command,
            "{} is already there. Delete it to regenerate it.",
            path.display()
        );
        return Ok(path.to_path_buf());
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| CommandError::io(command, e))?;
    }
    produce(path)?;
    if !path.is_file() {
        return Err(CommandError::missing_artifact(command, path));
    }
    debug!(command, path = %path.display(), "Artifact produced");
    Ok(path.to_path_buf())
}

/// Remove the artifact at `path` if it exists.
///
/// Returns the removed path.
pub fn remove_artifact(command: &str, path: &Path) -> CommandResult<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    info!(command, "Removing '{}'.", path.display());
    std::fs::remove_file(path).map_err(|e| CommandError::io(command, e))?;
    Ok(Some(path.display().to_string()))
}

/// Rename `produced` to `expected` when a tool wrote the file without the
/// expected extension.
///
/// Only renames if `expected` is absent, so a correct result is never
/// overwritten. Returns whether a rename happened.
pub fn fix_extension(command: &str, produced: &Path, expected: &Path) -> CommandResult<bool> {
    if produced == expected || !produced.is_file() || expected.is_file() {
        return Ok(false);
    }
    info!(command, "Fixing file extension of '{}'.", produced.display());
    std::fs::rename(produced, expected).map_err(|e| CommandError::io(command, e))?;
    Ok(true)
}

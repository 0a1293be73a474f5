//! Commands that build a container with LXD and turn it into an image.
//!
//! Dispatch order: `profile` → `configure` → `publish` → `export`. Each command
//! delegates to the one before it when its own result is missing.

mod configure;
mod export;
mod profile;
mod publish;

pub use configure::Configure;
pub use export::Export;
pub use profile::Profile;
pub use publish::Publish;

use super::dump;
use crate::error::{CommandError, CommandResult};
use serde_json::Value;
use std::path::Path;

/// Write `document` as YAML to `path`.
fn write_document(command: &str, path: &Path, document: &Value) -> CommandResult<()> {
    let text = dump(document)?;
    std::fs::write(path, text).map_err(|e| CommandError::io(command, e))
}

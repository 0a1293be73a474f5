//! Build commands and their orchestration.
//!
//! Every command is a node in a tree rooted at `strata`. A command only
//! implements the capabilities it has; the [`Orchestrator`] drives one
//! command through setup and the selected [`InvocationMode`].

pub mod artifact;
pub mod builtins;
pub mod lxc;
mod orchestrator;
pub mod plugins;
mod registry;

pub use orchestrator::{Env, Orchestrator, Phase};
pub use registry::{
    CliOptions, CommandEntry, CommandFactory, CommandSpec, Registry, RegistryError,
};

use crate::config::CommandContext;
use crate::error::{CommandError, CommandResult};
use serde_json::Value;
use std::path::PathBuf;

/// What the caller asks for when invoking a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Produce the command's result
    Run,
    /// Print a view of the configuration instead of running
    Introspect(Introspection),
    /// Remove this command's artifact and those of `depth` upstream commands
    Clean { depth: u32 },
}

/// Introspection views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Introspection {
    /// The load-time dictionary, including command context flags
    Dictionary,
    /// The merged configuration
    Config,
    /// The active plugins with their variables (the dry-run report)
    Plugins,
}

/// Result of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A file in the artifact directory
    Artifact(PathBuf),
    /// An image alias in the image store
    Image(String),
    /// A structured document for printing
    Report(Value),
    /// Names of removed artifacts and images
    Removed(Vec<String>),
}

impl Outcome {
    pub fn into_artifact(self, command: &str) -> CommandResult<PathBuf> {
        match self {
            Outcome::Artifact(path) => Ok(path),
            _ => Err(CommandError::unexpected_outcome(command, "artifact")),
        }
    }

    pub fn into_image(self, command: &str) -> CommandResult<String> {
        match self {
            Outcome::Image(alias) => Ok(alias),
            _ => Err(CommandError::unexpected_outcome(command, "image")),
        }
    }
}

/// The capabilities of a command.
///
/// `run`, `dry_run` and `clean_recursive` have no meaningful default: a command
/// that does not provide them fails naming the missing capability.
pub trait Command {
    /// Flags set while this command's configuration is loaded.
    fn context(&self) -> CommandContext {
        CommandContext::new()
    }

    fn run(&self, env: &Env<'_>) -> CommandResult<Outcome> {
        Err(CommandError::missing_capability("run", env.id()))
    }

    fn dry_run(&self, env: &Env<'_>) -> CommandResult<Value> {
        Err(CommandError::missing_capability("dry_run", env.id()))
    }

    /// Remove this command's own artifact, if present.
    fn clean(&self, _env: &Env<'_>) -> CommandResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn clean_recursive(&self, env: &Env<'_>, _depth: u32) -> CommandResult<Vec<String>> {
        Err(CommandError::missing_capability("clean_recursive", env.id()))
    }

    /// Where `run` puts its artifact, without producing it.
    fn result_path(&self, _env: &Env<'_>) -> CommandResult<Option<PathBuf>> {
        Ok(None)
    }
}

/// A namespace node with sub-commands and no behaviour of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Group;

impl Command for Group {}

/// Serialize a document as block-style YAML.
pub fn dump(value: &Value) -> CommandResult<String> {
    Ok(serde_yaml::to_string(value)?)
}

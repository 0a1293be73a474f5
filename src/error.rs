//! Error types for command invocations.
//!
//! Every error terminates the current invocation; nothing is retried. Commands
//! are idempotent, so re-running after fixing the cause is always safe.

use crate::commands::RegistryError;
use crate::config::ConfigError;
use serde::Serialize;
use std::path::PathBuf;

/// Error classes for programmatic handling and exit codes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or unreadable source, unresolvable field
    Configuration,
    /// Ambiguous, missing or multiply-parented command identifier
    Registry,
    /// Missing capability, invalid state, failed external tool
    Fatal,
}

impl ErrorCode {
    /// Process exit status for this class of error.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCode::Fatal => 1,
            ErrorCode::Configuration => 2,
            ErrorCode::Registry => 3,
        }
    }
}

/// Failure of an external tool (image store, packaging, playbook runner).
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to start '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{tool}' exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("unsupported compression algorithm '{0}'")]
    UnknownCompression(String),
}

/// Errors surfaced at the invocation boundary.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("missing '{capability}' implementation for '{command}'")]
    MissingCapability {
        capability: &'static str,
        command: String,
    },

    #[error("'{command}' used before its configuration was set up")]
    NotSetUp { command: String },

    #[error("'{0}' needs a subcommand; use 'strata --help' for help")]
    MissingSubcommand(String),

    #[error("'{command}' requires the argument '{argument}'")]
    MissingArgument {
        command: String,
        argument: &'static str,
    },

    #[error("'{command}' did not produce the expected {expected}")]
    UnexpectedOutcome {
        command: String,
        expected: &'static str,
    },

    #[error("'{command}' reported success but '{}' does not exist", path.display())]
    MissingArtifact { command: String, path: PathBuf },

    #[error("'{command}' failed: {source}")]
    Tool {
        command: String,
        #[source]
        source: ToolError,
    },

    #[error("'{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize report: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CommandError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CommandError::Config(_) => ErrorCode::Configuration,
            CommandError::Registry(_) => ErrorCode::Registry,
            _ => ErrorCode::Fatal,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // Convenience constructors

    pub fn missing_capability(capability: &'static str, command: &str) -> Self {
        Self::MissingCapability {
            capability,
            command: command.to_string(),
        }
    }

    pub fn unexpected_outcome(command: &str, expected: &'static str) -> Self {
        Self::UnexpectedOutcome {
            command: command.to_string(),
            expected,
        }
    }

    pub fn missing_artifact(command: &str, path: &std::path::Path) -> Self {
        Self::MissingArtifact {
            command: command.to_string(),
            path: path.to_path_buf(),
        }
    }

    pub fn tool(command: &str, source: ToolError) -> Self {
        Self::Tool {
            command: command.to_string(),
            source,
        }
    }

    pub fn io(command: &str, source: std::io::Error) -> Self {
        Self::Io {
            command: command.to_string(),
            source,
        }
    }
}

/// Result type for command operations.
pub type CommandResult<T> = std::result::Result<T, CommandError>;

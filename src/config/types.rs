//! Merged configuration and its well-known fields.

use super::items::{OrderedItem, resolve_ordered_items};
use super::loader::{ConfigPaths, ConfigSource};
use super::merge::deep_merge;
use crate::template::TemplateError;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration '{}': {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("configuration '{}' is not a mapping", .0.display())]
    NotAMapping(PathBuf),

    /// An undefined template variable outside a comment line. Undefined names
    /// are never rendered as empty text.
    #[error("cannot render '{}': {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error("'{}' is not a valid configuration file name", .0.display())]
    InvalidRootFile(PathBuf),

    #[error("missing required configuration field '{0}'")]
    MissingField(String),

    #[error("invalid configuration field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("{section} item '{item}': plugin file '{path}' not found")]
    PluginNotFound {
        section: String,
        item: String,
        path: String,
    },
}

/// Parsed `bootstrap.repository` line: `deb <uri> <distribution> <components...>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapRepository {
    pub uri: String,
    pub distribution: String,
    pub components: Vec<String>,
}

impl BootstrapRepository {
    pub fn parse(line: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidField {
            field: "bootstrap.repository".to_string(),
            reason: reason.to_string(),
        };
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("deb") => {}
            _ => return Err(invalid("expected a line starting with 'deb'")),
        }
        let uri = parts.next().ok_or_else(|| invalid("missing repository uri"))?;
        let distribution = parts.next().ok_or_else(|| invalid("missing distribution"))?;
        Ok(Self {
            uri: uri.to_string(),
            distribution: distribution.to_string(),
            components: parts.map(str::to_string).collect(),
        })
    }
}

/// The result of folding all configuration sources in precedence order.
///
/// Built once per command invocation and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Configuration {
    name: String,
    paths: ConfigPaths,
    dictionary: Value,
    sources: Vec<ConfigSource>,
    merged: Value,
}

impl Configuration {
    pub(crate) fn new(
        name: String,
        paths: ConfigPaths,
        dictionary: Value,
        sources: Vec<ConfigSource>,
        merged: Value,
    ) -> Self {
        Self {
            name,
            paths,
            dictionary,
            sources,
            merged,
        }
    }

    /// Name of the configuration (file stem of the root file).
    pub fn configuration_name(&self) -> &str {
        &self.name
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Contributing sources, lowest precedence first.
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// The merged configuration tree.
    pub fn merged(&self) -> &Value {
        &self.merged
    }

    /// Variables available to templates at load time.
    pub fn load_time_dictionary(&self) -> &Value {
        &self.dictionary
    }

    /// Get a config value by path (dot-separated).
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.merged;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Get a config value, falling back to `default` when absent.
    pub fn get_or<'a>(&'a self, path: &str, default: &'a Value) -> &'a Value {
        self.get(path).unwrap_or(default)
    }

    /// Get a config value as string.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    /// Get a string field that must be present.
    pub fn require_str(&self, path: &str) -> Result<&str, ConfigError> {
        match self.get(path) {
            None | Some(Value::Null) => Err(ConfigError::MissingField(path.to_string())),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ConfigError::InvalidField {
                field: path.to_string(),
                reason: "expected a string".to_string(),
            }),
        }
    }

    pub fn project_name(&self) -> &str {
        self.get_str("general.project_name").unwrap_or(&self.name)
    }

    pub fn compression(&self) -> Result<&str, ConfigError> {
        self.require_str("general.compression")
    }

    pub fn use_case(&self) -> Result<&str, ConfigError> {
        self.require_str("general.use_case")
    }

    pub fn architecture(&self) -> Result<&str, ConfigError> {
        self.require_str("bootstrap.architecture")
    }

    pub fn bootstrap_repository(&self) -> Result<BootstrapRepository, ConfigError> {
        BootstrapRepository::parse(self.require_str("bootstrap.repository")?)
    }

    pub fn bootstrap_uri(&self) -> Result<String, ConfigError> {
        Ok(self.bootstrap_repository()?.uri)
    }

    pub fn distribution(&self) -> Result<String, ConfigError> {
        Ok(self.bootstrap_repository()?.distribution)
    }

    pub fn bootstrap_components(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self.bootstrap_repository()?.components)
    }

    pub fn bootstrap_repository_key(&self) -> Result<&str, ConfigError> {
        self.require_str("bootstrap.repository_key")
    }

    pub fn bootstrap_tool(&self) -> Result<&str, ConfigError> {
        self.require_str("bootstrap.tool")
    }

    /// Container the configuration management runs against.
    pub fn container_name(&self) -> &str {
        self.get_str("lxc.container_name").unwrap_or(&self.name)
    }

    /// Resolve a named ordered collection across all layers.
    pub fn ordered_items(&self, section: &str) -> Result<Vec<OrderedItem>, ConfigError> {
        resolve_ordered_items(section, &self.sources)
    }

    /// Locate a plugin file: the project directory first, then the built-in plugin directory.
    pub fn resolve_plugin_path(&self, raw: &str) -> Option<PathBuf> {
        let raw_path = PathBuf::from(raw);
        if raw_path.is_absolute() {
            return raw_path.is_file().then_some(raw_path);
        }
        let project = self.paths.project_dir.join(&raw_path);
        if project.is_file() {
            return Some(project);
        }
        self.paths
            .builtin_plugin_dir
            .as_ref()
            .map(|dir| dir.join(&raw_path))
            .filter(|p| p.is_file())
    }

    /// Variables a plugin is rendered with: the load-time dictionary overlaid with its parameters.
    pub fn plugin_variables(&self, item: &OrderedItem) -> Value {
        deep_merge(self.dictionary.clone(), item.variables.clone())
    }
}

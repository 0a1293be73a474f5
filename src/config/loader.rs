//! Configuration loader with tier-based merging.
//!
//! Loads the root configuration file and its overlays, renders each document
//! against the load-time dictionary and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::{ConfigError, Configuration};
use crate::template::TemplateRenderer;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigTier {
    /// Embedded defaults (lowest priority)
    Defaults = 0,
    /// The root configuration file given on the command line
    Base = 1,
    /// Platform/distribution overlay (`overlay/all.yml`)
    Global = 2,
    /// Host overlay (`overlay/<hostname>.yml`)
    Host = 3,
    /// User overlay (`overlay/<username>.yml`, highest priority)
    User = 4,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Base => write!(f, "base"),
            ConfigTier::Global => write!(f, "global"),
            ConfigTier::Host => write!(f, "host"),
            ConfigTier::User => write!(f, "user"),
        }
    }
}

/// Directory holding the overlay documents, relative to the project directory.
pub const OVERLAY_DIR: &str = "overlay";

/// Name of the global overlay document.
pub const GLOBAL_OVERLAY: &str = "all";

/// Flags a command sets while its configuration is loaded.
///
/// Each flag is exposed to templates as `strata_<name>`.
pub type CommandContext = Map<String, Value>;

/// Context flags every configuration knows about, with their defaults.
pub fn default_context() -> CommandContext {
    let mut context = CommandContext::new();
    context.insert("create_distributable_image".into(), Value::Bool(false));
    context
}

/// Paths and identities that determine which documents make up a configuration.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// The root configuration file (absolute)
    pub root_file: PathBuf,
    /// Directory containing the root configuration file
    pub project_dir: PathBuf,
    /// Host name used to pick the host overlay
    pub host_name: String,
    /// User name used to pick the user overlay
    pub user_name: String,
    /// Plugin directory searched after the project directory
    pub builtin_plugin_dir: Option<PathBuf>,
    /// Where artifacts are written
    pub artifact_dir: PathBuf,
}

impl ConfigPaths {
    /// Discover paths for a root configuration file from the environment.
    ///
    /// - Host name from the system, user name from `$USER`/`$USERNAME`
    /// - `STRATA_PLUGIN_DIR` or `<data dir>/strata/plugins` for built-in plugins
    /// - `STRATA_ARTIFACT_DIR` or `<project dir>/artifacts` for artifacts
    pub fn discover(root_file: &Path) -> Result<Self, ConfigError> {
        let host_name = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        let user_name = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());

        let mut paths = Self::with_names(root_file, &host_name, &user_name)?;

        paths.builtin_plugin_dir = std::env::var("STRATA_PLUGIN_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|d| d.join("strata").join("plugins")));

        if let Ok(dir) = std::env::var("STRATA_ARTIFACT_DIR") {
            paths.artifact_dir = PathBuf::from(dir);
        }

        Ok(paths)
    }

    /// Create paths with explicit host and user names.
    ///
    /// No built-in plugin directory is set; artifacts go to `<project dir>/artifacts`.
    pub fn with_names(root_file: &Path, host_name: &str, user_name: &str) -> Result<Self, ConfigError> {
        let root_file = std::path::absolute(root_file).map_err(|source| ConfigError::Unreadable {
            path: root_file.to_path_buf(),
            source,
        })?;
        let project_dir = root_file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ConfigError::InvalidRootFile(root_file.clone()))?;
        let artifact_dir = project_dir.join("artifacts");

        Ok(Self {
            root_file,
            project_dir,
            host_name: host_name.to_string(),
            user_name: user_name.to_string(),
            builtin_plugin_dir: None,
            artifact_dir,
        })
    }

    /// Set the artifact directory.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Set the built-in plugin directory.
    pub fn with_builtin_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.builtin_plugin_dir = Some(dir.into());
        self
    }

    /// Configuration name: the file stem of the root configuration file.
    pub fn configuration_name(&self) -> Result<String, ConfigError> {
        self.root_file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| ConfigError::InvalidRootFile(self.root_file.clone()))
    }

    /// Plugins shipped with the project.
    pub fn project_plugin_dir(&self) -> PathBuf {
        self.project_dir.join("plugins")
    }

    /// Documents for each file-backed tier, lowest precedence first.
    pub fn layer_files(&self) -> Vec<(ConfigTier, PathBuf)> {
        let overlays = self.project_dir.join(OVERLAY_DIR);
        vec![
            (ConfigTier::Base, self.root_file.clone()),
            (ConfigTier::Global, overlays.join(format!("{}.yml", GLOBAL_OVERLAY))),
            (ConfigTier::Host, overlays.join(format!("{}.yml", self.host_name))),
            (ConfigTier::User, overlays.join(format!("{}.yml", self.user_name))),
        ]
    }
}

/// One loaded configuration document with its provenance.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Tier of this document
    pub tier: ConfigTier,
    /// File path (None for embedded defaults)
    pub path: Option<PathBuf>,
    /// Parsed document, always a mapping
    pub document: Value,
}

impl ConfigSource {
    /// Describe where this source came from, for error messages and logs.
    pub fn origin(&self) -> String {
        match &self.path {
            Some(p) => format!("{} ({})", self.tier, p.display()),
            None => self.tier.to_string(),
        }
    }
}

/// Built-in defaults (tier 0).
pub fn defaults_document() -> Value {
    json!({
        "general": {
            "compression": "xz",
            "use_case": "strata_run"
        },
        "bootstrap": {
            "tool": "debootstrap"
        }
    })
}

/// Configuration loader that handles tier-based merging.
pub struct ConfigLoader<'a> {
    paths: ConfigPaths,
    context: CommandContext,
    renderer: &'a dyn TemplateRenderer,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(paths: ConfigPaths, renderer: &'a dyn TemplateRenderer) -> Self {
        Self {
            paths,
            context: default_context(),
            renderer,
        }
    }

    /// Overlay command context flags onto the defaults.
    pub fn with_context(mut self, context: &CommandContext) -> Self {
        for (key, value) in context {
            self.context.insert(key.clone(), value.clone());
        }
        self
    }

    /// Build the load-time dictionary that templates in configuration documents can use.
    pub fn load_time_dictionary(&self) -> Result<Value, ConfigError> {
        let mut dict = Map::new();
        let project_dir = self.paths.project_dir.display().to_string();
        dict.insert("strata_project_directory".into(), project_dir.into());
        dict.insert(
            "strata_configuration_name".into(),
            self.paths.configuration_name()?.into(),
        );
        dict.insert(
            "strata_current_user_name".into(),
            self.paths.user_name.clone().into(),
        );
        dict.insert("strata_host_name".into(), self.paths.host_name.clone().into());
        let work_dir = std::env::current_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|_| ".".to_string());
        dict.insert("strata_work_directory".into(), work_dir.into());
        dict.insert(
            "strata_project_plugin_directory".into(),
            self.paths.project_plugin_dir().display().to_string().into(),
        );
        dict.insert(
            "strata_builtin_plugin_directory".into(),
            self.paths
                .builtin_plugin_dir
                .as_ref()
                .map(|d| Value::String(d.display().to_string()))
                .unwrap_or(Value::Null),
        );
        for (key, value) in &self.context {
            dict.insert(format!("strata_{}", key), value.clone());
        }
        Ok(Value::Object(dict))
    }

    /// Load all tiers and merge them.
    ///
    /// The root file must exist; overlays that do not exist are skipped. A
    /// present but unreadable or malformed document fails the whole load.
    pub fn load(self) -> Result<Configuration, ConfigError> {
        let dictionary = self.load_time_dictionary()?;
        let mut sources = vec![ConfigSource {
            tier: ConfigTier::Defaults,
            path: None,
            document: defaults_document(),
        }];

        for (tier, path) in self.paths.layer_files() {
            if tier != ConfigTier::Base && !path.is_file() {
                debug!(%tier, path = %path.display(), "Overlay not present, skipping");
                continue;
            }
            let document = self.read_document(&path, &dictionary)?;
            debug!(%tier, path = %path.display(), "Loaded configuration layer");
            sources.push(ConfigSource {
                tier,
                path: Some(path),
                document,
            });
        }

        let merged = deep_merge_all(sources.iter().map(|s| s.document.clone()));
        let name = self.paths.configuration_name()?;
        info!(configuration = %name, layers = sources.len(), "Configuration merged");

        Ok(Configuration::new(name, self.paths, dictionary, sources, merged))
    }

    fn read_document(&self, path: &Path, dictionary: &Value) -> Result<Value, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let rendered = self
            .renderer
            .render(&raw, dictionary)
            .map_err(|source| ConfigError::Template {
                path: path.to_path_buf(),
                source,
            })?;
        parse_document(path, &rendered)
    }
}

/// Parse YAML text into a mapping. An empty document is an empty mapping.
pub fn parse_document(path: &Path, text: &str) -> Result<Value, ConfigError> {
    let blank = text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    });
    if blank {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_yaml::from_str(text).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(value),
        _ => Err(ConfigError::NotAMapping(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::PlaceholderRenderer;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_layer_files_order() {
        let paths = ConfigPaths::with_names(Path::new("/p/dev.yml"), "box", "alice").unwrap();
        let tiers: Vec<ConfigTier> = paths.layer_files().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            tiers,
            vec![ConfigTier::Base, ConfigTier::Global, ConfigTier::Host, ConfigTier::User]
        );
        let files = paths.layer_files();
        assert!(files[2].1.ends_with("overlay/box.yml"));
        assert!(files[3].1.ends_with("overlay/alice.yml"));
    }

    #[test]
    fn test_configuration_name_is_file_stem() {
        let paths = ConfigPaths::with_names(Path::new("/p/my-project.yml"), "h", "u").unwrap();
        assert_eq!(paths.configuration_name().unwrap(), "my-project");
    }

    #[test]
    fn test_load_defaults_and_base() {
        let temp = TempDir::new().unwrap();
        let root = write(temp.path(), "dev.yml", "bootstrap:\n  architecture: amd64\n");
        let paths = ConfigPaths::with_names(&root, "h", "u").unwrap();

        let config = ConfigLoader::new(paths, &PlaceholderRenderer).load().unwrap();

        assert_eq!(config.sources().len(), 2);
        assert_eq!(config.get_str("general.compression"), Some("xz"));
        assert_eq!(config.get_str("bootstrap.architecture"), Some("amd64"));
    }

    #[test]
    fn test_missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_names(&temp.path().join("nope.yml"), "h", "u").unwrap();
        let err = ConfigLoader::new(paths, &PlaceholderRenderer).load().unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn test_malformed_overlay_is_error() {
        let temp = TempDir::new().unwrap();
        let root = write(temp.path(), "dev.yml", "general: {}\n");
        write(temp.path(), "overlay/all.yml", "general: [unclosed\n");
        let paths = ConfigPaths::with_names(&root, "h", "u").unwrap();
        let err = ConfigLoader::new(paths, &PlaceholderRenderer).load().unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_scalar_document_is_not_a_mapping() {
        let err = parse_document(Path::new("x.yml"), "just a string").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping(_)));
    }

    #[test]
    fn test_documents_are_rendered_with_dictionary() {
        let temp = TempDir::new().unwrap();
        let root = write(
            temp.path(),
            "dev.yml",
            "lxc:\n  container_name: {{ strata_configuration_name }}-{{ strata_current_user_name }}\n",
        );
        let paths = ConfigPaths::with_names(&root, "h", "bob").unwrap();
        let config = ConfigLoader::new(paths, &PlaceholderRenderer).load().unwrap();
        assert_eq!(config.get_str("lxc.container_name"), Some("dev-bob"));
    }

    #[test]
    fn test_context_flags_in_dictionary() {
        let temp = TempDir::new().unwrap();
        let root = write(temp.path(), "dev.yml", "");
        let paths = ConfigPaths::with_names(&root, "h", "u").unwrap();

        let plain = ConfigLoader::new(paths.clone(), &PlaceholderRenderer)
            .load_time_dictionary()
            .unwrap();
        assert_eq!(plain["strata_create_distributable_image"], false);

        let mut context = CommandContext::new();
        context.insert("create_distributable_image".into(), true.into());
        let flagged = ConfigLoader::new(paths, &PlaceholderRenderer)
            .with_context(&context)
            .load_time_dictionary()
            .unwrap();
        assert_eq!(flagged["strata_create_distributable_image"], true);
    }
}

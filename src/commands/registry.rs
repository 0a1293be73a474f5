//! Command registration and topology.
//!
//! Commands are registered explicitly with their parent's dotted identifier.
//! The registry derives each command's dotted identifier from the parent chain
//! and answers parent, child and sibling queries.

use super::Command;
use std::collections::BTreeMap;

/// Creates a fresh command instance for one invocation.
pub type CommandFactory = fn() -> Box<dyn Command>;

/// Command-line options a leaf command offers besides its configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliOptions {
    /// `--dictionary`, `--config`, `--plugins`
    pub introspection: bool,
    /// `--clean`, `--recursive-clean N`
    pub clean: bool,
}

impl CliOptions {
    pub const NONE: CliOptions = CliOptions {
        introspection: false,
        clean: false,
    };
    pub const ALL: CliOptions = CliOptions {
        introspection: true,
        clean: true,
    };
}

/// Static description of a command type, as registered.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    /// Short name, lowercase, no dots
    pub name: &'static str,
    /// Dotted identifiers of declared parents; exactly one except for the root
    pub parents: &'static [&'static str],
    /// Dotted identifier of the command this one delegates to
    pub upstream: Option<&'static str>,
    pub about: &'static str,
    pub options: CliOptions,
    pub factory: CommandFactory,
}

impl CommandSpec {
    pub const fn root(name: &'static str, about: &'static str, factory: CommandFactory) -> Self {
        Self {
            name,
            parents: &[],
            upstream: None,
            about,
            options: CliOptions::NONE,
            factory,
        }
    }

    pub const fn child(
        name: &'static str,
        parent: &'static [&'static str],
        about: &'static str,
        factory: CommandFactory,
    ) -> Self {
        Self {
            name,
            parents: parent,
            upstream: None,
            about,
            options: CliOptions::NONE,
            factory,
        }
    }

    pub const fn with_upstream(mut self, upstream: &'static str) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub const fn with_options(mut self, options: CliOptions) -> Self {
        self.options = options;
        self
    }
}

/// A registered command.
#[derive(Clone)]
pub struct CommandEntry {
    /// Dotted identifier, e.g. `strata.lxc.export`
    pub id: String,
    pub short_name: &'static str,
    /// Dotted identifier of the parent (None for the root)
    pub parent: Option<String>,
    pub upstream: Option<String>,
    pub about: &'static str,
    pub options: CliOptions,
    factory: CommandFactory,
}

impl CommandEntry {
    pub fn instantiate(&self) -> Box<dyn Command> {
        (self.factory)()
    }

    /// Identifier with dots replaced, usable in file and image names.
    pub fn file_name_prefix(&self) -> String {
        self.id.replace('.', "_")
    }
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("upstream", &self.upstream)
            .finish()
    }
}

/// Errors raised while building or querying the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid command name '{0}': expected lowercase letters, digits or '_'")]
    InvalidName(String),

    #[error("command '{0}' is registered twice")]
    Duplicate(String),

    #[error("command '{command}' declares unknown parent '{parent}'")]
    UnknownParent { command: String, parent: String },

    #[error("command '{command}' declares multiple parents: {}", parents.join(", "))]
    MultipleParents {
        command: String,
        parents: Vec<String>,
    },

    #[error("command '{command}' is a second root next to '{existing}'")]
    MultipleRoots { existing: String, command: String },

    #[error("command '{command}' delegates to unknown command '{upstream}'")]
    UnknownUpstream { command: String, upstream: String },

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("no root command registered")]
    NoRoot,
}

fn valid_short_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Table of registered commands keyed by dotted identifier.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<String, CommandEntry>,
    root: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in command tree.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for spec in super::builtins::COMMANDS {
            registry.register(*spec)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Register a command. Its parent must already be registered.
    ///
    /// Returns the dotted identifier assigned to the command.
    pub fn register(&mut self, spec: CommandSpec) -> Result<String, RegistryError> {
        if !valid_short_name(spec.name) {
            return Err(RegistryError::InvalidName(spec.name.to_string()));
        }

        let (id, parent) = match spec.parents {
            [] => {
                if let Some(existing) = &self.root {
                    return Err(RegistryError::MultipleRoots {
                        existing: existing.clone(),
                        command: spec.name.to_string(),
                    });
                }
                (spec.name.to_string(), None)
            }
            [parent] => {
                if !self.entries.contains_key(*parent) {
                    return Err(RegistryError::UnknownParent {
                        command: spec.name.to_string(),
                        parent: parent.to_string(),
                    });
                }
                (format!("{}.{}", parent, spec.name), Some(parent.to_string()))
            }
            parents => {
                return Err(RegistryError::MultipleParents {
                    command: spec.name.to_string(),
                    parents: parents.iter().map(|p| p.to_string()).collect(),
                });
            }
        };

        if self.entries.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        if parent.is_none() {
            self.root = Some(id.clone());
        }

        self.entries.insert(
            id.clone(),
            CommandEntry {
                id: id.clone(),
                short_name: spec.name,
                parent,
                upstream: spec.upstream.map(str::to_string),
                about: spec.about,
                options: spec.options,
                factory: spec.factory,
            },
        );
        Ok(id)
    }

    /// Check cross references that can only be resolved once everything is registered.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.root.is_none() {
            return Err(RegistryError::NoRoot);
        }
        for entry in self.entries.values() {
            if let Some(upstream) = &entry.upstream
                && !self.entries.contains_key(upstream)
            {
                return Err(RegistryError::UnknownUpstream {
                    command: entry.id.clone(),
                    upstream: upstream.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&CommandEntry> {
        self.entries.get(id)
    }

    pub fn require(&self, id: &str) -> Result<&CommandEntry, RegistryError> {
        self.get(id)
            .ok_or_else(|| RegistryError::UnknownCommand(id.to_string()))
    }

    pub fn root(&self) -> Result<&CommandEntry, RegistryError> {
        let id = self.root.as_deref().ok_or(RegistryError::NoRoot)?;
        self.require(id)
    }

    /// Direct children of `id`, keyed by short name.
    pub fn get_children(&self, id: &str) -> BTreeMap<&'static str, &CommandEntry> {
        self.entries
            .values()
            .filter(|e| e.parent.as_deref() == Some(id))
            .map(|e| (e.short_name, e))
            .collect()
    }

    pub fn get_parent(&self, id: &str) -> Option<&str> {
        self.entries.get(id)?.parent.as_deref()
    }

    /// Other children of the parent of `id`. The root has no siblings.
    pub fn siblings(&self, id: &str) -> Vec<&CommandEntry> {
        match self.get_parent(id) {
            Some(parent) => self
                .get_children(parent)
                .into_values()
                .filter(|e| e.id != id)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Group;

    fn group() -> Box<dyn Command> {
        Box::new(Group)
    }

    fn sample() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(CommandSpec::root("strata", "root", group))
            .unwrap();
        registry
            .register(CommandSpec::child("lxc", &["strata"], "lxc", group))
            .unwrap();
        registry
            .register(CommandSpec::child("image", &["strata"], "image", group))
            .unwrap();
        registry
            .register(CommandSpec::child("export", &["strata.lxc"], "export", group))
            .unwrap();
        registry
            .register(CommandSpec::child("publish", &["strata.lxc"], "publish", group))
            .unwrap();
        registry
    }

    #[test]
    fn test_dotted_identifiers() {
        let registry = sample();
        assert!(registry.get("strata").is_some());
        assert!(registry.get("strata.lxc").is_some());
        let export = registry.get("strata.lxc.export").unwrap();
        assert_eq!(export.short_name, "export");
        assert_eq!(export.file_name_prefix(), "strata_lxc_export");
        assert!(registry.get("lxc.export").is_none());
    }

    #[test]
    fn test_children_are_direct_only() {
        let registry = sample();
        let children: Vec<_> = registry.get_children("strata").into_keys().collect();
        assert_eq!(children, vec!["image", "lxc"]);
        let children: Vec<_> = registry.get_children("strata.lxc").into_keys().collect();
        assert_eq!(children, vec!["export", "publish"]);
        assert!(registry.get_children("strata.lxc.export").is_empty());
    }

    #[test]
    fn test_parent_and_siblings() {
        let registry = sample();
        assert_eq!(registry.get_parent("strata.lxc.export"), Some("strata.lxc"));
        assert_eq!(registry.get_parent("strata"), None);
        let siblings: Vec<_> = registry
            .siblings("strata.lxc.export")
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(siblings, vec!["strata.lxc.publish"]);
        assert!(registry.siblings("strata").is_empty());
    }

    #[test]
    fn test_rejects_multiple_parents() {
        let mut registry = sample();
        let err = registry
            .register(CommandSpec::child(
                "bad",
                &["strata.lxc", "strata.image"],
                "bad",
                group,
            ))
            .unwrap_err();
        assert!(matches!(err, RegistryError::MultipleParents { .. }));
    }

    #[test]
    fn test_rejects_second_root() {
        let mut registry = sample();
        let err = registry
            .register(CommandSpec::root("other", "other", group))
            .unwrap_err();
        assert!(matches!(err, RegistryError::MultipleRoots { .. }));
    }

    #[test]
    fn test_rejects_duplicate_short_name_under_same_parent() {
        let mut registry = sample();
        let err = registry
            .register(CommandSpec::child("export", &["strata.lxc"], "again", group))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(id) if id == "strata.lxc.export"));
    }

    #[test]
    fn test_same_short_name_under_different_parents() {
        let mut registry = sample();
        let id = registry
            .register(CommandSpec::child("export", &["strata.image"], "export", group))
            .unwrap();
        assert_eq!(id, "strata.image.export");
    }

    #[test]
    fn test_rejects_unknown_parent_and_bad_names() {
        let mut registry = sample();
        assert!(matches!(
            registry.register(CommandSpec::child("x", &["strata.nope"], "x", group)),
            Err(RegistryError::UnknownParent { .. })
        ));
        assert!(matches!(
            registry.register(CommandSpec::child("Upper", &["strata"], "x", group)),
            Err(RegistryError::InvalidName(_))
        ));
        assert!(matches!(
            registry.register(CommandSpec::child("a.b", &["strata"], "x", group)),
            Err(RegistryError::InvalidName(_))
        ));
    }

    #[test]
    fn test_validate_unknown_upstream() {
        let mut registry = sample();
        registry
            .register(
                CommandSpec::child("pack", &["strata.image"], "pack", group)
                    .with_upstream("strata.image.missing"),
            )
            .unwrap();
        assert!(matches!(
            registry.validate(),
            Err(RegistryError::UnknownUpstream { .. })
        ));
    }

    #[test]
    fn test_builtins_are_consistent() {
        let registry = Registry::with_builtins().unwrap();
        assert_eq!(registry.root().unwrap().id, "strata");
        for id in [
            "strata.clean",
            "strata.lxc",
            "strata.lxc.profile",
            "strata.lxc.configure",
            "strata.lxc.publish",
            "strata.lxc.export",
        ] {
            assert!(registry.get(id).is_some(), "{} missing", id);
        }
        assert_eq!(
            registry.get("strata.lxc.export").unwrap().upstream.as_deref(),
            Some("strata.lxc.publish")
        );
    }
}

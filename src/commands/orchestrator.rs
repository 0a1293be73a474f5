//! Per-invocation lifecycle of a single command.
//!
//! An [`Orchestrator`] is created for one command, set up with a root
//! configuration file and then asked for exactly the operation the caller
//! selected. Delegation to an upstream command, and cleaning of children or
//! siblings, happens through fresh orchestrators; nothing is shared between
//! instances except the registry and the collaborators.

use super::artifact::{ArtifactDir, artifact_base_name};
use super::registry::{CommandEntry, Registry};
use super::{Command, Introspection, InvocationMode, Outcome};
use crate::config::{CommandContext, ConfigLoader, ConfigPaths, Configuration};
use crate::error::{CommandError, CommandResult};
use crate::tools::Toolbox;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

/// Lifecycle phase of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ConfigLoaded,
    Running,
    CleaningShallow,
    CleaningRecursive,
    Introspecting,
    Done,
}

/// Drives one command through setup and one or more operations.
pub struct Orchestrator<'a> {
    registry: &'a Registry,
    toolbox: &'a Toolbox,
    entry: &'a CommandEntry,
    command: Box<dyn Command>,
    context: CommandContext,
    config: Option<Configuration>,
    phase: Phase,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a Registry, toolbox: &'a Toolbox, id: &str) -> CommandResult<Self> {
        let entry = registry.require(id)?;
        let command = entry.instantiate();
        let context = command.context();
        Ok(Self {
            registry,
            toolbox,
            entry,
            command,
            context,
            config: None,
            phase: Phase::Idle,
        })
    }

    /// Inherit context flags from a delegating command.
    ///
    /// The command's own flags take precedence over inherited ones.
    pub fn with_context(mut self, inherited: &CommandContext) -> Self {
        let own = std::mem::replace(&mut self.context, inherited.clone());
        self.context.extend(own);
        self
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    /// Load and merge the configuration rooted at `paths.root_file`.
    pub fn setup(&mut self, paths: ConfigPaths) -> CommandResult<()> {
        debug!(command = %self.entry.id, root = %paths.root_file.display(), "Setting up");
        let config = ConfigLoader::new(paths, self.toolbox.renderer.as_ref())
            .with_context(&self.context)
            .load()?;
        self.config = Some(config);
        self.phase = Phase::ConfigLoaded;
        Ok(())
    }

    fn env(&self) -> CommandResult<Env<'_>> {
        let config = self.config.as_ref().ok_or_else(|| CommandError::NotSetUp {
            command: self.entry.id.clone(),
        })?;
        Ok(Env {
            registry: self.registry,
            toolbox: self.toolbox,
            entry: self.entry,
            config,
            context: &self.context,
        })
    }

    fn enter(&mut self, phase: Phase) -> CommandResult<()> {
        if self.phase == Phase::Idle {
            return Err(CommandError::NotSetUp {
                command: self.entry.id.clone(),
            });
        }
        self.phase = phase;
        Ok(())
    }

    fn finish<T>(&mut self, result: CommandResult<T>) -> CommandResult<T> {
        self.phase = Phase::Done;
        result
    }

    pub fn run(&mut self) -> CommandResult<Outcome> {
        self.enter(Phase::Running)?;
        let result = self.env().and_then(|env| self.command.run(&env));
        self.finish(result)
    }

    pub fn dry_run(&mut self) -> CommandResult<Value> {
        self.enter(Phase::Running)?;
        let result = self.env().and_then(|env| self.command.dry_run(&env));
        self.finish(result)
    }

    /// Remove this command's own artifact.
    pub fn clean(&mut self) -> CommandResult<Vec<String>> {
        self.enter(Phase::CleaningShallow)?;
        let result = self.env().and_then(|env| self.command.clean(&env));
        self.finish(result)
    }

    /// Remove this command's artifact and those of `depth` upstream commands.
    pub fn clean_recursive(&mut self, depth: u32) -> CommandResult<Vec<String>> {
        self.enter(Phase::CleaningRecursive)?;
        let result = self
            .env()
            .and_then(|env| self.command.clean_recursive(&env, depth));
        self.finish(result)
    }

    /// Clean every direct child and, recursively, their children.
    pub fn clean_children(&mut self) -> CommandResult<Vec<String>> {
        self.enter(Phase::CleaningShallow)?;
        let result = self.env().and_then(|env| env.clean_children());
        self.finish(result)
    }

    /// Clean every other child of this command's parent, and their children.
    pub fn clean_siblings(&mut self) -> CommandResult<Vec<String>> {
        self.enter(Phase::CleaningShallow)?;
        let result = self.env().and_then(|env| env.clean_siblings());
        self.finish(result)
    }

    pub fn introspect(&mut self, view: Introspection) -> CommandResult<Value> {
        self.enter(Phase::Introspecting)?;
        let result = self.env().and_then(|env| match view {
            Introspection::Dictionary => Ok(env.config().load_time_dictionary().clone()),
            Introspection::Config => Ok(env.config().merged().clone()),
            Introspection::Plugins => self.command.dry_run(&env),
        });
        self.finish(result)
    }

    /// Where `run` puts its artifact, without producing it.
    pub fn result_path(&self) -> CommandResult<Option<PathBuf>> {
        let env = self.env()?;
        self.command.result_path(&env)
    }

    /// Perform the operation selected by `mode`.
    pub fn execute(&mut self, mode: InvocationMode) -> CommandResult<Outcome> {
        match mode {
            InvocationMode::Run => self.run(),
            InvocationMode::Introspect(view) => self.introspect(view).map(Outcome::Report),
            InvocationMode::Clean { depth } => self.clean_recursive(depth).map(Outcome::Removed),
        }
    }
}

/// What a command sees while one of its operations runs.
pub struct Env<'a> {
    registry: &'a Registry,
    toolbox: &'a Toolbox,
    entry: &'a CommandEntry,
    config: &'a Configuration,
    context: &'a CommandContext,
}

impl<'a> Env<'a> {
    /// Dotted identifier of the running command.
    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn entry(&self) -> &CommandEntry {
        self.entry
    }

    pub fn config(&self) -> &Configuration {
        self.config
    }

    pub fn toolbox(&self) -> &Toolbox {
        self.toolbox
    }

    pub fn context(&self) -> &CommandContext {
        self.context
    }

    /// Base name of everything this command produces for the configuration.
    pub fn base_name(&self) -> String {
        artifact_base_name(self.config.configuration_name(), &self.entry.id)
    }

    pub fn artifacts(&self) -> ArtifactDir {
        ArtifactDir::new(&self.config.paths().artifact_dir, self.base_name())
    }

    /// Set up an orchestrator for another command on the same configuration file.
    fn sibling_orchestrator(&self, id: &str, inherit: bool) -> CommandResult<Orchestrator<'a>> {
        let mut orchestrator = Orchestrator::new(self.registry, self.toolbox, id)?;
        if inherit {
            orchestrator = orchestrator.with_context(self.context);
        }
        orchestrator.setup(self.config.paths().clone())?;
        Ok(orchestrator)
    }

    pub fn has_upstream(&self) -> bool {
        self.entry.upstream.is_some()
    }

    /// The command this one delegates to, set up and inheriting the context.
    pub fn upstream(&self) -> CommandResult<Orchestrator<'a>> {
        let upstream = self
            .entry
            .upstream
            .as_deref()
            .ok_or_else(|| CommandError::missing_capability("upstream", &self.entry.id))?;
        debug!(command = %self.entry.id, upstream, "Delegating to upstream command");
        self.sibling_orchestrator(upstream, true)
    }

    /// Clean `command`'s own artifact, then `depth` levels of upstream commands.
    pub fn cascade_clean(&self, command: &dyn Command, depth: u32) -> CommandResult<Vec<String>> {
        let mut removed = command.clean(self)?;
        if depth == 0 {
            return Ok(removed);
        }
        if self.has_upstream() {
            removed.extend(self.upstream()?.clean_recursive(depth - 1)?);
        } else {
            debug!(command = %self.entry.id, depth, "No upstream command left to clean");
        }
        Ok(removed)
    }

    pub fn clean_children(&self) -> CommandResult<Vec<String>> {
        let mut removed = Vec::new();
        for child in self.registry.get_children(&self.entry.id).into_values() {
            let mut orchestrator = self.sibling_orchestrator(&child.id, false)?;
            removed.extend(orchestrator.clean()?);
            removed.extend(orchestrator.clean_children()?);
        }
        Ok(removed)
    }

    pub fn clean_siblings(&self) -> CommandResult<Vec<String>> {
        let mut removed = Vec::new();
        for sibling in self.registry.siblings(&self.entry.id) {
            info!(command = %self.entry.id, sibling = %sibling.id, "Cleaning");
            let mut orchestrator = self.sibling_orchestrator(&sibling.id, false)?;
            removed.extend(orchestrator.clean()?);
            removed.extend(orchestrator.clean_children()?);
        }
        Ok(removed)
    }
}

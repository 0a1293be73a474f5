use super::write_document;
use crate::commands::artifact::{produce_once, remove_artifact};
use crate::commands::plugins::{self, mask_passwords};
use crate::commands::{Command, Env, Outcome, dump};
use crate::error::{CommandError, CommandResult};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// Configuration section listing the playbooks.
pub const SECTION: &str = "playbooks";

const EXTENSION: &str = ".yml";

/// Applies the playbooks to the container.
///
/// The artifact is the report of the applied playbooks; as long as it exists
/// the container counts as configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Configure;

impl Command for Configure {
    fn dry_run(&self, env: &Env<'_>) -> CommandResult<Value> {
        let playbooks = plugins::collect(env, SECTION, false)?;
        Ok(plugins::report(SECTION, &playbooks))
    }

    fn run(&self, env: &Env<'_>) -> CommandResult<Outcome> {
        let target = env.artifacts().file(EXTENSION);
        let path = produce_once(env.id(), &target, |path| {
            env.upstream()?.run()?;

            let container = env.config().container_name();
            let playbooks = plugins::collect(env, SECTION, false)?;
            for playbook in &playbooks {
                let dictionary = dump(&mask_passwords(&playbook.variables))?;
                info!(
                    playbook = %playbook.name,
                    path = %playbook.path.display(),
                    container,
                    "Running playbook with dictionary:\n{}",
                    dictionary
                );
                env.toolbox()
                    .playbooks
                    .run_playbook(&playbook.path, container, &playbook.variables)
                    .map_err(|e| CommandError::tool(env.id(), e))?;
            }
            write_document(env.id(), path, &plugins::report(SECTION, &playbooks))
        })?;
        Ok(Outcome::Artifact(path))
    }

    fn clean(&self, env: &Env<'_>) -> CommandResult<Vec<String>> {
        let target = env.artifacts().file(EXTENSION);
        Ok(remove_artifact(env.id(), &target)?.into_iter().collect())
    }

    fn clean_recursive(&self, env: &Env<'_>, depth: u32) -> CommandResult<Vec<String>> {
        env.cascade_clean(self, depth)
    }

    fn result_path(&self, env: &Env<'_>) -> CommandResult<Option<PathBuf>> {
        Ok(Some(env.artifacts().file(EXTENSION)))
    }
}

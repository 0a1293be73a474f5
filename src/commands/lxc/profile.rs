use super::write_document;
use crate::commands::artifact::{produce_once, remove_artifact};
use crate::commands::plugins::{self, mask_passwords};
use crate::commands::{Command, Env, Outcome, dump};
use crate::error::{CommandError, CommandResult};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::info;

/// Configuration section listing the profiles.
pub const SECTION: &str = "lxc_profiles";

const EXTENSION: &str = ".yml";

/// Renders the container profiles and writes them to the container host.
///
/// The artifact maps the section to the names of the profiles now available.
#[derive(Debug, Clone, Copy, Default)]
pub struct Profile;

/// Container profile name of one profile item of a configuration.
fn profile_name(configuration: &str, item: &str) -> String {
    format!("{}_{}", configuration, item)
}

impl Command for Profile {
    fn dry_run(&self, env: &Env<'_>) -> CommandResult<Value> {
        let profiles = plugins::collect(env, SECTION, true)?;
        Ok(plugins::report(SECTION, &profiles))
    }

    fn run(&self, env: &Env<'_>) -> CommandResult<Outcome> {
        let target = env.artifacts().file(EXTENSION);
        let path = produce_once(env.id(), &target, |path| {
            let mut names = Vec::new();
            for profile in plugins::collect(env, SECTION, true)? {
                let dictionary = dump(&mask_passwords(&profile.variables))?;
                info!(
                    profile = %profile.name,
                    path = %profile.path.display(),
                    "Creating profile with dictionary:\n{}",
                    dictionary
                );
                let name = profile_name(env.config().configuration_name(), &profile.name);
                let text = profile.rendered.unwrap_or_default();
                let (full_name, created) = env
                    .toolbox()
                    .images
                    .write_profile(&name, &text)
                    .map_err(|e| CommandError::tool(env.id(), e))?;
                if created {
                    info!("Created lxc profile {}.", full_name);
                }
                names.push(Value::String(full_name));
            }
            info!(
                "The following profiles are now available: {}",
                names.iter().filter_map(serde_json::Value::as_str).collect::<Vec<_>>().join(", ")
            );

            let mut document = Map::new();
            document.insert(SECTION.to_string(), Value::Array(names));
            write_document(env.id(), path, &Value::Object(document))
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

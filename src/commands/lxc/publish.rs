use crate::commands::{Command, Env, Outcome};
use crate::error::{CommandError, CommandResult};
use serde_json::Value;
use tracing::info;

/// Publishes the configured container to the image store.
///
/// The image alias is the command's artifact base name. An existing alias
/// short-circuits publishing the same way an existing artifact file does.
#[derive(Debug, Clone, Copy, Default)]
pub struct Publish;

impl Command for Publish {
    fn dry_run(&self, env: &Env<'_>) -> CommandResult<Value> {
        env.upstream()?.dry_run()
    }

    fn run(&self, env: &Env<'_>) -> CommandResult<Outcome> {
        let alias = env.base_name();
        let images = &env.toolbox().images;
        let tool_error = |e| CommandError::tool(env.id(), e);

        if images.has_image(&alias).map_err(tool_error)? {
            info!(
                "Image {} is already there. Delete it to regenerate it.",
                alias
            );
            return Ok(Outcome::Image(alias));
        }

        env.upstream()?.run()?;

        let container = env.config().container_name();
        info!(container, alias = %alias, "Publishing container");
        images.publish(container, &alias).map_err(tool_error)?;
        Ok(Outcome::Image(alias))
    }

    fn clean(&self, env: &Env<'_>) -> CommandResult<Vec<String>> {
        let alias = env.base_name();
        let images = &env.toolbox().images;
        let tool_error = |e| CommandError::tool(env.id(), e);

        if !images.has_image(&alias).map_err(tool_error)? {
            return Ok(Vec::new());
        }
        info!("Removing image '{}'.", alias);
        images.delete_image(&alias).map_err(tool_error)?;
        Ok(vec![alias])
    }

    fn clean_recursive(&self, env: &Env<'_>, depth: u32) -> CommandResult<Vec<String>> {
        env.cascade_clean(self, depth)
    }
}

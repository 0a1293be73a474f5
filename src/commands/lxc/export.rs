use crate::commands::artifact::{fix_extension, produce_once, remove_artifact};
use crate::commands::{Command, Env, Outcome};
use crate::config::CommandContext;
use crate::error::{CommandError, CommandResult};
use crate::tools::extension_for_algorithm;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// Exports the published image from the image store into the artifact directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Export;

impl Export {
    /// The exported file, named after the image store's compression algorithm.
    fn target(env: &Env<'_>) -> CommandResult<PathBuf> {
        let algorithm = env
            .toolbox()
            .images
            .compression_algorithm()
            .map_err(|e| CommandError::tool(env.id(), e))?;
        let extension =
            extension_for_algorithm(&algorithm).map_err(|e| CommandError::tool(env.id(), e))?;
        Ok(env.artifacts().file(extension))
    }
}

impl Command for Export {
    fn context(&self) -> CommandContext {
        let mut context = CommandContext::new();
        context.insert("create_distributable_image".into(), Value::Bool(true));
        context
    }

    fn dry_run(&self, env: &Env<'_>) -> CommandResult<Value> {
        env.upstream()?.dry_run()
    }

    fn run(&self, env: &Env<'_>) -> CommandResult<Outcome> {
        let target = Self::target(env)?;
        let path = produce_once(env.id(), &target, |target| {
            let mut upstream = env.upstream()?;
            let alias = upstream.run()?.into_image(upstream.id())?;

            info!(alias = %alias, "Going to export lxc image from image store.");
            let bare = env.artifacts().bare();
            env.toolbox()
                .images
                .export(&alias, &bare)
                .map_err(|e| CommandError::tool(env.id(), e))?;

            // Some LXD versions write the export without its extension.
            fix_extension(env.id(), &bare, target)?;
            Ok(())
        })?;
        Ok(Outcome::Artifact(path))
    }

    fn clean(&self, env: &Env<'_>) -> CommandResult<Vec<String>> {
        let target = Self::target(env)?;
        Ok(remove_artifact(env.id(), &target)?.into_iter().collect())
    }

    fn clean_recursive(&self, env: &Env<'_>, depth: u32) -> CommandResult<Vec<String>> {
        env.cascade_clean(self, depth)
    }

    fn result_path(&self, env: &Env<'_>) -> CommandResult<Option<PathBuf>> {
        Self::target(env).map(Some)
    }
}

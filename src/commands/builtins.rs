//! The built-in command tree.

use super::lxc::{Configure, Export, Profile, Publish};
use super::registry::{CliOptions, CommandSpec};
use super::{Command, Env, Group, Outcome};
use crate::error::CommandResult;
use tracing::info;

fn group() -> Box<dyn Command> {
    Box::new(Group)
}

fn clean() -> Box<dyn Command> {
    Box::new(Clean)
}

fn profile() -> Box<dyn Command> {
    Box::new(Profile)
}

fn configure() -> Box<dyn Command> {
    Box::new(Configure)
}

fn publish() -> Box<dyn Command> {
    Box::new(Publish)
}

fn export() -> Box<dyn Command> {
    Box::new(Export)
}

/// Registration table, parents before children.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec::root("strata", "build and provision container images", group),
    CommandSpec::child(
        "clean",
        &["strata"],
        "clean the artifacts of all commands",
        clean,
    ),
    CommandSpec::child("lxc", &["strata"], "LXD related commands", group),
    CommandSpec::child(
        "profile",
        &["strata.lxc"],
        "render the LXD container profiles",
        profile,
    )
    .with_options(CliOptions::ALL),
    CommandSpec::child(
        "configure",
        &["strata.lxc"],
        "apply the playbooks to the LXD container",
        configure,
    )
    .with_upstream("strata.lxc.profile")
    .with_options(CliOptions::ALL),
    CommandSpec::child(
        "publish",
        &["strata.lxc"],
        "publish the LXD container as an image",
        publish,
    )
    .with_upstream("strata.lxc.configure")
    .with_options(CliOptions::ALL),
    CommandSpec::child(
        "export",
        &["strata.lxc"],
        "export an image from the LXD image store",
        export,
    )
    .with_upstream("strata.lxc.publish")
    .with_options(CliOptions::ALL),
];

/// `strata clean`: cleans every other top-level command and its sub-commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clean;

impl Command for Clean {
    fn run(&self, env: &Env<'_>) -> CommandResult<Outcome> {
        let removed = env.clean_siblings()?;
        info!(count = removed.len(), "Removed artifacts");
        Ok(Outcome::Removed(removed))
    }
}

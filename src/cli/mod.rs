//! CLI definitions for strata.
//!
//! Global options are declared with clap's derive macros. The command tree is
//! added from the [`Registry`]: groups become nested subcommands, leaf
//! commands take a configuration file and, depending on their
//! [`CliOptions`](crate::commands::CliOptions), mutually exclusive
//! introspection and clean flags.

use crate::commands::{CommandEntry, Introspection, InvocationMode, Registry};
use crate::error::{CommandError, CommandResult};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, CommandFactory, Parser, value_parser};
use std::path::PathBuf;

/// Build and provision container images from layered configuration
#[derive(Parser, Debug)]
#[command(name = "strata", author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,
}

const CONFIG_FILE: &str = "config_file";
const MODE_GROUP: &str = "mode";

/// A fully parsed command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Dotted identifier of the selected command
    pub command: String,
    pub config_file: PathBuf,
    pub mode: InvocationMode,
}

/// The complete clap command: global options plus the registered command tree.
pub fn build_command(registry: &Registry) -> CommandResult<clap::Command> {
    let root = registry.root()?;
    Ok(add_children(Cli::command(), registry, root))
}

fn add_children(mut cmd: clap::Command, registry: &Registry, parent: &CommandEntry) -> clap::Command {
    for (name, entry) in registry.get_children(&parent.id) {
        let sub = clap::Command::new(name).about(entry.about);
        let sub = if registry.get_children(&entry.id).is_empty() {
            leaf_arguments(sub, entry)
        } else {
            add_children(sub, registry, entry)
        };
        cmd = cmd.subcommand(sub);
    }
    cmd
}

fn leaf_arguments(mut cmd: clap::Command, entry: &CommandEntry) -> clap::Command {
    let mut modes: Vec<&'static str> = Vec::new();

    if entry.options.introspection {
        cmd = cmd
            .arg(
                Arg::new("dictionary")
                    .long("dictionary")
                    .action(ArgAction::SetTrue)
                    .help("dump the load time dictionary instead of running the command"),
            )
            .arg(
                Arg::new("config")
                    .long("config")
                    .action(ArgAction::SetTrue)
                    .help("dump the merged configuration instead of running the command"),
            )
            .arg(
                Arg::new("plugins")
                    .long("plugins")
                    .action(ArgAction::SetTrue)
                    .help("dump the active plugins including their dictionaries instead of running the command"),
            );
        modes.extend(["dictionary", "config", "plugins"]);
    }

    if entry.options.clean {
        cmd = cmd
            .arg(
                Arg::new("clean")
                    .long("clean")
                    .action(ArgAction::SetTrue)
                    .help("clean the artifacts that got produced by this command"),
            )
            .arg(
                Arg::new("recursive_clean")
                    .long("recursive-clean")
                    .value_name("N")
                    .value_parser(value_parser!(u32))
                    .help("clean the artifacts that got produced by this and the preceding N commands"),
            );
        modes.extend(["clean", "recursive_clean"]);
    }

    if !modes.is_empty() {
        cmd = cmd.group(ArgGroup::new(MODE_GROUP).args(modes).multiple(false));
    }

    cmd.arg(
        Arg::new(CONFIG_FILE)
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("the configuration file"),
    )
}

fn flag(matches: &ArgMatches, id: &str) -> bool {
    matches!(matches.try_get_one::<bool>(id), Ok(Some(true)))
}

/// Convert the selected flags of a leaf command into an invocation mode.
pub fn invocation_mode(matches: &ArgMatches) -> InvocationMode {
    if flag(matches, "dictionary") {
        InvocationMode::Introspect(Introspection::Dictionary)
    } else if flag(matches, "config") {
        InvocationMode::Introspect(Introspection::Config)
    } else if flag(matches, "plugins") {
        InvocationMode::Introspect(Introspection::Plugins)
    } else if flag(matches, "clean") {
        InvocationMode::Clean { depth: 0 }
    } else if let Ok(Some(depth)) = matches.try_get_one::<u32>("recursive_clean") {
        InvocationMode::Clean { depth: *depth }
    } else {
        InvocationMode::Run
    }
}

/// Resolve parsed arguments into the selected command, file and mode.
pub fn parse_invocation(registry: &Registry, matches: &ArgMatches) -> CommandResult<Invocation> {
    let mut command = registry.root()?.id.clone();
    let mut current = matches;
    while let Some((name, sub)) = current.subcommand() {
        command = format!("{}.{}", command, name);
        current = sub;
    }

    registry.require(&command)?;
    if !registry.get_children(&command).is_empty() {
        return Err(CommandError::MissingSubcommand(command));
    }

    let config_file = current
        .get_one::<PathBuf>(CONFIG_FILE)
        .cloned()
        .ok_or_else(|| CommandError::MissingArgument {
            command: command.clone(),
            argument: CONFIG_FILE,
        })?;

    Ok(Invocation {
        command,
        config_file,
        mode: invocation_mode(current),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CommandResult<Invocation> {
        let registry = Registry::with_builtins().unwrap();
        let matches = build_command(&registry)
            .unwrap()
            .try_get_matches_from(args)
            .unwrap();
        parse_invocation(&registry, &matches)
    }

    #[test]
    fn test_run_is_default_mode() {
        let invocation = parse(&["strata", "lxc", "export", "sample.yml"]).unwrap();
        assert_eq!(invocation.command, "strata.lxc.export");
        assert_eq!(invocation.config_file, PathBuf::from("sample.yml"));
        assert_eq!(invocation.mode, InvocationMode::Run);
    }

    #[test]
    fn test_mode_flags() {
        let cases = [
            ("--dictionary", InvocationMode::Introspect(Introspection::Dictionary)),
            ("--config", InvocationMode::Introspect(Introspection::Config)),
            ("--plugins", InvocationMode::Introspect(Introspection::Plugins)),
            ("--clean", InvocationMode::Clean { depth: 0 }),
        ];
        for (flag, mode) in cases {
            let invocation = parse(&["strata", "lxc", "configure", flag, "sample.yml"]).unwrap();
            assert_eq!(invocation.mode, mode, "{}", flag);
        }
        let invocation =
            parse(&["strata", "lxc", "publish", "--recursive-clean", "2", "sample.yml"]).unwrap();
        assert_eq!(invocation.mode, InvocationMode::Clean { depth: 2 });
    }

    #[test]
    fn test_mode_flags_are_exclusive() {
        let registry = Registry::with_builtins().unwrap();
        let result = build_command(&registry).unwrap().try_get_matches_from([
            "strata",
            "lxc",
            "export",
            "--clean",
            "--config",
            "sample.yml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_group_without_subcommand() {
        let err = parse(&["strata", "lxc"]).unwrap_err();
        assert!(matches!(err, CommandError::MissingSubcommand(id) if id == "strata.lxc"));
        let err = parse(&["strata"]).unwrap_err();
        assert!(matches!(err, CommandError::MissingSubcommand(id) if id == "strata"));
    }

    #[test]
    fn test_clean_command() {
        let invocation = parse(&["strata", "clean", "sample.yml"]).unwrap();
        assert_eq!(invocation.command, "strata.clean");
        assert_eq!(invocation.mode, InvocationMode::Run);
    }

    #[test]
    fn test_global_options() {
        let registry = Registry::with_builtins().unwrap();
        let matches = build_command(&registry)
            .unwrap()
            .try_get_matches_from(["strata", "--verbose", "lxc", "profile", "a.yml"])
            .unwrap();
        let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log, "2");
    }
}

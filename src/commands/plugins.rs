//! Plugin collection for aggregator commands.
//!
//! A plugin is an ordered item whose `path` names a file (a profile template,
//! a playbook). Collecting resolves the file, computes its variables and, for
//! templated plugins, renders it.

use super::Env;
use crate::config::{ConfigError, OrderedItem};
use crate::error::{CommandError, CommandResult};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// A resolved plugin, ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    pub name: String,
    pub path: PathBuf,
    pub variables: Value,
    /// Rendered file content, for templated plugins
    pub rendered: Option<String>,
}

/// Resolve the items of `section` into plugins.
///
/// When `render` is set, each plugin file is read and rendered with its
/// variables.
pub fn collect(env: &Env<'_>, section: &str, render: bool) -> CommandResult<Vec<Plugin>> {
    let config = env.config();
    let mut plugins = Vec::new();

    for item in config.ordered_items(section)? {
        let path = locate(env, section, &item)?;
        let variables = config.plugin_variables(&item);
        let rendered = if render {
            let template =
                std::fs::read_to_string(&path).map_err(|source| ConfigError::Unreadable {
                    path: path.clone(),
                    source,
                })?;
            let text = env
                .toolbox()
                .renderer
                .render(&template, &variables)
                .map_err(|source| ConfigError::Template {
                    path: path.clone(),
                    source,
                })?;
            Some(text)
        } else {
            None
        };
        plugins.push(Plugin {
            name: item.name,
            path,
            variables,
            rendered,
        });
    }

    Ok(plugins)
}

fn locate(env: &Env<'_>, section: &str, item: &OrderedItem) -> CommandResult<PathBuf> {
    let raw = item.require_path(section)?;
    env.config().resolve_plugin_path(raw).ok_or_else(|| {
        CommandError::Config(ConfigError::PluginNotFound {
            section: section.to_string(),
            item: item.name.clone(),
            path: raw.to_string(),
        })
    })
}

/// Build the plugin report: `{section: [{name: {path, dictionary, result?}}]}`.
///
/// A section without plugins yields an empty mapping.
pub fn report(section: &str, plugins: &[Plugin]) -> Value {
    let mut report = Map::new();
    if plugins.is_empty() {
        return Value::Object(report);
    }

    let entries = plugins
        .iter()
        .map(|plugin| {
            let mut info = Map::new();
            info.insert("path".into(), plugin.path.display().to_string().into());
            info.insert("dictionary".into(), plugin.variables.clone());
            if let Some(text) = &plugin.rendered {
                info.insert("result".into(), text.clone().into());
            }
            let mut entry = Map::new();
            entry.insert(plugin.name.clone(), Value::Object(info));
            Value::Object(entry)
        })
        .collect();
    report.insert(section.to_string(), Value::Array(entries));
    Value::Object(report)
}

/// Copy of `value` with every value under a key mentioning "password" masked.
///
/// Used before variables end up in logs.
pub fn mask_passwords(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let masked = if key.to_lowercase().contains("password") {
                        Value::String("*****".to_string())
                    } else {
                        mask_passwords(value)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask_passwords).collect()),
        other => other.clone(),
    }
}

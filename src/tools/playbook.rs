//! Configuration-management playbook execution.

use super::process::run_tool;
use crate::error::ToolError;
use serde_json::Value;
use std::path::Path;

/// Applies a playbook to a container.
pub trait PlaybookRunner {
    fn run_playbook(&self, playbook: &Path, container: &str, variables: &Value)
    -> Result<(), ToolError>;
}

/// Runs playbooks with `ansible-playbook` over the LXD connection plugin.
#[derive(Debug, Clone)]
pub struct AnsiblePlaybookRunner {
    program: String,
}

impl Default for AnsiblePlaybookRunner {
    fn default() -> Self {
        Self {
            program: "ansible-playbook".to_string(),
        }
    }
}

impl PlaybookRunner for AnsiblePlaybookRunner {
    fn run_playbook(
        &self,
        playbook: &Path,
        container: &str,
        variables: &Value,
    ) -> Result<(), ToolError> {
        let inventory = format!("{},", container);
        let extra_vars = variables.to_string();
        let playbook = playbook.to_string_lossy();
        run_tool(
            &self.program,
            &[
                "--connection=lxd",
                "--inventory",
                &inventory,
                "--extra-vars",
                &extra_vars,
                &playbook,
            ],
        )?;
        Ok(())
    }
}

//! External collaborators used by commands.
//!
//! Commands never shell out directly; they go through the traits here so the
//! orchestration can be exercised without LXD or Ansible installed.

mod image_store;
mod playbook;
mod process;

pub use image_store::{ImageStore, LxdImageStore, extension_for_algorithm};
pub use playbook::{AnsiblePlaybookRunner, PlaybookRunner};
pub use process::{run_tool, run_tool_with_input};

use crate::template::{PlaceholderRenderer, TemplateRenderer};

/// The set of collaborators an invocation works with.
pub struct Toolbox {
    pub renderer: Box<dyn TemplateRenderer>,
    pub images: Box<dyn ImageStore>,
    pub playbooks: Box<dyn PlaybookRunner>,
}

impl Toolbox {
    pub fn new(
        renderer: Box<dyn TemplateRenderer>,
        images: Box<dyn ImageStore>,
        playbooks: Box<dyn PlaybookRunner>,
    ) -> Self {
        Self {
            renderer,
            images,
            playbooks,
        }
    }

    /// Collaborators backed by the `lxc` and `ansible-playbook` executables.
    pub fn system() -> Self {
        Self::new(
            Box::new(PlaceholderRenderer),
            Box::new(LxdImageStore::default()),
            Box::new(AnsiblePlaybookRunner::default()),
        )
    }
}

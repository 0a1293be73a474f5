//! Layered configuration system.
//!
//! Consolidates configuration from five tiers with field-by-field YAML merging:
//! 1. **Defaults** - Embedded built-in values
//! 2. **Base** - The configuration file given on the command line
//! 3. **Global** - `<project>/overlay/all.yml`
//! 4. **Host** - `<project>/overlay/<hostname>.yml`
//! 5. **User** - `<project>/overlay/<username>.yml`
//!
//! ## Merge Strategy
//! - Mappings: deep merge field-by-field
//! - Scalars and lists: the highest tier that defines the key wins outright
//! - Ordered item sections (`playbooks`, `lxc_profiles`): first-introduction
//!   order with deep-merged parameters, see [`items`]
//!
//! ## Environment Variables
//! - `STRATA_ARTIFACT_DIR` - Artifact directory (default: `<project>/artifacts`)
//! - `STRATA_PLUGIN_DIR` - Built-in plugin directory

pub mod items;
mod loader;
mod merge;
mod types;

pub use items::{OrderedItem, resolve_ordered_items};
pub use loader::{
    CommandContext, ConfigLoader, ConfigPaths, ConfigSource, ConfigTier, GLOBAL_OVERLAY,
    OVERLAY_DIR, default_context, defaults_document, parse_document,
};
pub use merge::{deep_merge, deep_merge_all};
pub use types::{BootstrapRepository, ConfigError, Configuration};

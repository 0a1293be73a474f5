//! Container image store access.

use super::process::{run_tool, run_tool_with_input};
use crate::error::ToolError;
use std::path::Path;

/// The container host: holds container profiles, takes published containers
/// as images and exports images.
pub trait ImageStore {
    /// Create or update the container profile `name` with the YAML `text`.
    ///
    /// Returns the full profile name and whether the profile was newly created.
    fn write_profile(&self, name: &str, text: &str) -> Result<(String, bool), ToolError>;

    /// Whether an image with this alias exists.
    fn has_image(&self, alias: &str) -> Result<bool, ToolError>;

    /// Publish a container as an image under `alias`.
    fn publish(&self, container: &str, alias: &str) -> Result<(), ToolError>;

    /// Remove the image with this alias.
    fn delete_image(&self, alias: &str) -> Result<(), ToolError>;

    /// Export the image to `target`.
    ///
    /// `target` has no extension; the store may or may not append one.
    fn export(&self, alias: &str, target: &Path) -> Result<(), ToolError>;

    /// Compression algorithm the store uses for exported images.
    fn compression_algorithm(&self) -> Result<String, ToolError>;
}

/// File extension of an exported image for a compression algorithm.
pub fn extension_for_algorithm(algorithm: &str) -> Result<&'static str, ToolError> {
    match algorithm {
        "gzip" | "gz" => Ok(".tar.gz"),
        "bzip2" => Ok(".tar.bz2"),
        "xz" => Ok(".tar.xz"),
        "lzma" => Ok(".tar.lzma"),
        "zstd" => Ok(".tar.zst"),
        "none" => Ok(".tar"),
        other => Err(ToolError::UnknownCompression(other.to_string())),
    }
}

/// LXD image store driven through the `lxc` client.
#[derive(Debug, Clone)]
pub struct LxdImageStore {
    program: String,
    remote: String,
}

impl Default for LxdImageStore {
    fn default() -> Self {
        Self {
            program: "lxc".to_string(),
            remote: "local".to_string(),
        }
    }
}

impl LxdImageStore {
    fn image_ref(&self, alias: &str) -> String {
        format!("{}:{}", self.remote, alias)
    }
}

impl ImageStore for LxdImageStore {
    fn write_profile(&self, name: &str, text: &str) -> Result<(String, bool), ToolError> {
        let created = match run_tool(&self.program, &["profile", "show", name]) {
            Ok(_) => false,
            Err(ToolError::Failed { .. }) => {
                run_tool(&self.program, &["profile", "create", name])?;
                true
            }
            Err(e) => return Err(e),
        };
        run_tool_with_input(&self.program, &["profile", "edit", name], text)?;
        Ok((name.to_string(), created))
    }

    fn has_image(&self, alias: &str) -> Result<bool, ToolError> {
        match run_tool(&self.program, &["image", "info", &self.image_ref(alias)]) {
            Ok(_) => Ok(true),
            Err(ToolError::Failed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn publish(&self, container: &str, alias: &str) -> Result<(), ToolError> {
        run_tool(
            &self.program,
            &["publish", container, "--force", "--alias", alias],
        )?;
        Ok(())
    }

    fn delete_image(&self, alias: &str) -> Result<(), ToolError> {
        run_tool(&self.program, &["image", "delete", &self.image_ref(alias)])?;
        Ok(())
    }

    fn export(&self, alias: &str, target: &Path) -> Result<(), ToolError> {
        let target = target.to_string_lossy();
        run_tool(
            &self.program,
            &["image", "export", &self.image_ref(alias), &target],
        )?;
        Ok(())
    }

    fn compression_algorithm(&self) -> Result<String, ToolError> {
        let out = run_tool(
            &self.program,
            &["config", "get", "images.compression_algorithm"],
        )?;
        let algorithm = out.trim();
        // LXD reports an empty value when the default is in effect.
        if algorithm.is_empty() {
            Ok("gzip".to_string())
        } else {
            Ok(algorithm.to_string())
        }
    }
}

use crate::error::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ManifestPlugin, PluginManifest};

const MANIFEST_FILE: &str = "plugin.toml";

/// Plugin loader handles loading manifest plugins from disk
#[derive(Debug, Default)]
pub struct PluginLoader;

impl PluginLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a plugin from a manifest file or from a directory holding `plugin.toml`
    pub async fn load(&self, path: &Path) -> Result<ManifestPlugin> {
        info!("Loading plugin from: {}", path.display());

        let (manifest_path, inferred_name) = Self::locate_manifest(path).await?;
        let content = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| {
                Error::InvalidPlugin(format!(
                    "Failed to read plugin manifest {}: {e}",
                    manifest_path.display()
                ))
            })?;

        let manifest: PluginManifest = toml::from_str(&content)
            .map_err(|e| Error::InvalidPlugin(format!("Invalid plugin manifest: {e}")))?;

        let rules = Self::compile_rules(&manifest)?;
        let base_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        debug!(
            "Loaded plugin '{}' with {} rewrite rule(s)",
            manifest.plugin.name.as_deref().unwrap_or(&inferred_name),
            rules.len()
        );
        Ok(ManifestPlugin::new(manifest, inferred_name, base_dir, rules))
    }

    /// Find the manifest for `path` and the name inferred from its location
    async fn locate_manifest(path: &Path) -> Result<(PathBuf, String)> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::InvalidPlugin(format!("{}: {e}", path.display())))?;

        let (manifest_path, name_source) = if metadata.is_dir() {
            (path.join(MANIFEST_FILE), path.file_name())
        } else {
            (path.to_path_buf(), path.file_stem())
        };

        let inferred_name = name_source
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| {
                Error::InvalidPlugin(format!("Cannot infer plugin name from {}", path.display()))
            })?;

        Ok((manifest_path, inferred_name))
    }

    fn compile_rules(manifest: &PluginManifest) -> Result<Vec<(Regex, String)>> {
        manifest
            .rewrites
            .iter()
            .map(|rule| {
                let pattern = Regex::new(&rule.pattern).map_err(|e| {
                    Error::InvalidPlugin(format!("Invalid rewrite pattern '{}': {e}", rule.pattern))
                })?;
                Ok((pattern, rule.replacement.clone()))
            })
            .collect()
    }
}

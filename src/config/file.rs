//! Optional `codemod.toml` configuration file

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "codemod.toml";

/// Values a config file may provide; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub extensions: Option<Vec<String>>,
    #[serde(default)]
    pub add_extensions: Vec<String>,
    #[serde(default)]
    pub plugins: Vec<PathBuf>,
    #[serde(default)]
    pub requires: Vec<PathBuf>,
    #[serde(default)]
    pub plugin_options: HashMap<String, toml::Value>,
    pub dry: Option<bool>,
}

impl ConfigFile {
    /// Load a config file, resolving relative paths against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for plugin in &mut config.plugins {
            *plugin = base.join(&*plugin);
        }
        for require in &mut config.requires {
            *require = base.join(&*require);
        }

        debug!("Loaded config file {}", path.display());
        Ok(config)
    }

    /// Load `codemod.toml` from `dir` if it exists
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn plugin_options_json(&self) -> Result<HashMap<String, serde_json::Value>> {
        self.plugin_options
            .iter()
            .map(|(name, value)| {
                let json = serde_json::to_value(value)
                    .with_context(|| format!("Invalid options for plugin {name}"))?;
                Ok((name.clone(), json))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_resolves_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
            extensions = [".js"]
            plugins = ["plugins/rename.toml"]
            requires = ["/abs/setup.json"]
            dry = true

            [plugin_options.rename]
            to = "bar"
            "#,
        )
        .unwrap();

        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.extensions, Some(vec![".js".to_string()]));
        assert_eq!(config.plugins, vec![temp_dir.path().join("plugins/rename.toml")]);
        assert_eq!(config.requires, vec![PathBuf::from("/abs/setup.json")]);
        assert_eq!(config.dry, Some(true));

        let options = config.plugin_options_json().unwrap();
        assert_eq!(options["rename"], serde_json::json!({"to": "bar"}));
    }

    #[test]
    fn test_discover_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ConfigFile::discover(temp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "printer = \"fancy\"\n").unwrap();
        assert!(ConfigFile::load(&path).is_err());
    }
}

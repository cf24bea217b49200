use crate::plugin::TransformPlugin;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

pub mod file;
pub mod options;

pub use file::ConfigFile;
pub use options::{parse_plugin_options, Command, Options};

/// Extensions transformed when walking a directory, unless overridden
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".jsx", ".es6", ".es", ".mjs", ".ts", ".tsx"];

/// Configuration for a single run
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source_paths: Vec<PathBuf>,
    pub extensions: BTreeSet<String>,
    pub local_plugins: Vec<PathBuf>,
    pub plugin_options: HashMap<String, serde_json::Value>,
    pub requires: Vec<PathBuf>,
    pub stdio: bool,
    pub dry: bool,
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_paths: Vec::new(),
            extensions: default_extensions(),
            local_plugins: Vec::new(),
            plugin_options: HashMap::new(),
            requires: Vec::new(),
            stdio: false,
            dry: false,
            verbosity: 0,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for `plugin`, by declared name first and inferred name second
    pub fn plugin_options_for(&self, plugin: &dyn TransformPlugin) -> serde_json::Value {
        self.plugin_options
            .get(plugin.name())
            .or_else(|| {
                plugin
                    .inferred_name()
                    .and_then(|name| self.plugin_options.get(name))
            })
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}

pub fn default_extensions() -> BTreeSet<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

/// Normalize an extension to its dotted form, e.g. `js` to `.js`
pub fn normalize_extension(extension: &str) -> String {
    let extension = extension.trim();
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

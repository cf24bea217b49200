use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

use super::TransformPlugin;

/// Plugin registry keeps plugins in the order they run
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn TransformPlugin>>,
    name_index: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin in the registry
    pub fn register(&mut self, plugin: Arc<dyn TransformPlugin>) -> Result<()> {
        // Check for name conflicts
        let name = plugin.name().to_string();
        if self.name_index.contains_key(&name) {
            return Err(Error::PluginAlreadyExists(name));
        }

        self.name_index.insert(name, self.plugins.len());
        self.plugins.push(plugin);
        Ok(())
    }

    /// Find plugin by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn TransformPlugin>> {
        self.name_index.get(name).map(|&index| &self.plugins[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TransformPlugin>> {
        self.plugins.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{ManifestPlugin, PluginManifest};
    use std::path::PathBuf;

    fn plugin(name: &str) -> Arc<dyn TransformPlugin> {
        Arc::new(ManifestPlugin::new(
            PluginManifest::default(),
            name.to_string(),
            PathBuf::from("."),
            Vec::new(),
        ))
    }

    #[test]
    fn test_register_preserves_order() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("first")).unwrap();
        registry.register(plugin("second")).unwrap();

        assert_eq!(registry.names(), vec!["first", "second"]);
        assert_eq!(registry.get("second").unwrap().name(), "second");
        assert!(registry.get("third").is_none());
    }

    #[test]
    fn test_register_duplicate_name() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("same")).unwrap();

        let err = registry.register(plugin("same")).unwrap_err();
        assert!(matches!(err, Error::PluginAlreadyExists(name) if name == "same"));
        assert_eq!(registry.len(), 1);
    }
}

//! Transformation plugins
//!
//! A plugin receives one source file at a time along with the shared [`Host`].
//! [`ManifestPlugin`] is the built-in kind, declared in a TOML manifest.

use crate::error::Result;
use crate::runtime::{listener, Host, Loader};
use crate::sources::SourceFile;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, trace};

pub mod loader;
pub mod registry;

pub use loader::PluginLoader;
pub use registry::PluginRegistry;

/// Transformation plugin applied to each source file
#[async_trait]
pub trait TransformPlugin: Send + Sync {
    /// Name used to report the plugin and to look up its options
    fn name(&self) -> &str;

    /// Fallback name derived from where the plugin was loaded from
    fn inferred_name(&self) -> Option<&str> {
        None
    }

    /// Transform `source`, returning `None` when the text is unchanged
    async fn transform(&self, source: &SourceFile, context: &PluginContext)
        -> Result<Option<String>>;
}

/// Context handed to a plugin for one file
pub struct PluginContext {
    pub host: Host,
    pub options: serde_json::Value,
    pub filename: PathBuf,
}

/// Plugin manifest loaded from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub plugin: PluginInfo,
    #[serde(default)]
    pub setup: SetupManifest,
    #[serde(default, rename = "rewrite")]
    pub rewrites: Vec<RewriteRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginInfo {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Side effects a manifest plugin performs against the host on every run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupManifest {
    /// Modules to load, relative to the manifest
    #[serde(default)]
    pub require: Vec<String>,
    /// Properties to assign on the global object
    #[serde(default)]
    pub globals: toml::Table,
    /// Events to subscribe a listener to
    #[serde(default)]
    pub listeners: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
}

/// Plugin defined by a manifest of regex rewrites
#[derive(Debug)]
pub struct ManifestPlugin {
    declared_name: Option<String>,
    inferred_name: String,
    base_dir: PathBuf,
    setup: SetupManifest,
    rules: Vec<(Regex, String)>,
}

impl ManifestPlugin {
    pub fn new(
        manifest: PluginManifest,
        inferred_name: String,
        base_dir: PathBuf,
        rules: Vec<(Regex, String)>,
    ) -> Self {
        Self {
            declared_name: manifest.plugin.name,
            inferred_name,
            base_dir,
            setup: manifest.setup,
            rules,
        }
    }

    pub fn declared_name(&self) -> Option<&str> {
        self.declared_name.as_deref()
    }

    fn apply_setup(&self, host: &Host) -> Result<()> {
        for specifier in &self.setup.require {
            let path = Loader::resolve(&self.base_dir, specifier);
            host.loader.require(&path)?;
        }

        for (name, value) in &self.setup.globals {
            host.global.set(name.clone(), serde_json::to_value(value)?);
        }

        for event in &self.setup.listeners {
            let plugin = self.name().to_string();
            let event_name = event.clone();
            host.process.on(
                event,
                listener(move |payload| trace!("{} received '{}': {}", plugin, event_name, payload)),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl TransformPlugin for ManifestPlugin {
    fn name(&self) -> &str {
        self.declared_name.as_deref().unwrap_or(&self.inferred_name)
    }

    fn inferred_name(&self) -> Option<&str> {
        Some(&self.inferred_name)
    }

    async fn transform(
        &self,
        source: &SourceFile,
        context: &PluginContext,
    ) -> Result<Option<String>> {
        self.apply_setup(&context.host)?;

        let mut text = source.content.clone();
        for (pattern, replacement) in &self.rules {
            let replacement = render_template(replacement, &context.options);
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }

        if text == source.content {
            return Ok(None);
        }
        debug!("{} rewrote {}", self.name(), source.path.display());
        Ok(Some(text))
    }
}

/// Substitute `{{key}}` placeholders with top-level option values
pub fn render_template(template: &str, options: &serde_json::Value) -> String {
    let Some(options) = options.as_object() else {
        return template.to_string();
    };

    options.iter().fold(template.to_string(), |text, (key, value)| {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        text.replace(&format!("{{{{{key}}}}}"), &rendered)
    })
}

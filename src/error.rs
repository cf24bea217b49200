use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::PatternError),

    // Host runtime errors
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("No loader registered for extension: {0}")]
    UnknownExtension(String),

    #[error("Cannot delete non-configurable property: {0}")]
    NonConfigurable(String),

    #[error("Registry error: {0}")]
    Registry(String),

    // Plugin-related errors
    #[error("Plugin already exists: {0}")]
    PluginAlreadyExists(String),

    #[error("Invalid plugin: {0}")]
    InvalidPlugin(String),

    #[error("Plugin execution error: {0}")]
    PluginExecution(String),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Module loader with a path-keyed cache and an extension-keyed loader table

use crate::error::{Error, Result};
use crate::snapshot::{KeyedRegistry, ModuleLoader};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

use super::Handle;

/// A loaded module as stored in the module cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    pub path: PathBuf,
    pub exports: serde_json::Value,
}

impl Module {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            exports: serde_json::Value::Null,
        }
    }

    pub fn with_exports(path: impl Into<PathBuf>, exports: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            exports,
        }
    }
}

/// Turns the source text of a file into a module
pub type LoaderFn = dyn Fn(&Path, &str) -> Result<Module> + Send + Sync;

pub type ExtensionLoader = Handle<LoaderFn>;

/// Wrap a closure as an extension loader handle
pub fn extension_loader<F>(f: F) -> ExtensionLoader
where
    F: Fn(&Path, &str) -> Result<Module> + Send + Sync + 'static,
{
    let inner: Arc<LoaderFn> = Arc::new(f);
    Handle::from_arc(inner)
}

/// String-keyed table of handles with interior mutability
pub struct Table<V: ?Sized> {
    entries: RwLock<BTreeMap<String, Handle<V>>>,
}

impl<V: ?Sized> Table<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    // A poisoned lock still holds a consistent map; the panicking writer never
    // leaves a half-applied insert behind.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Handle<V>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Handle<V>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Handle<V>> {
        self.read().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Handle<V>) -> Option<Handle<V>> {
        self.write().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Handle<V>> {
        self.write().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<V: ?Sized> Default for Table<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ?Sized + Send + Sync> KeyedRegistry<V> for Table<V> {
    fn entries(&self) -> Vec<(String, Handle<V>)> {
        self.read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn set(&self, key: &str, value: Handle<V>) -> Result<()> {
        self.insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.remove(key);
        Ok(())
    }
}

/// Loads modules from disk and keeps them in a cache keyed by absolute path
pub struct Loader {
    cache: Table<Module>,
    extensions: Table<LoaderFn>,
}

impl Loader {
    /// Create a loader with an empty cache and no extension loaders
    pub fn new() -> Self {
        Self {
            cache: Table::new(),
            extensions: Table::new(),
        }
    }

    /// Create a loader that understands `.json` and `.toml` modules
    pub fn with_builtin_extensions() -> Self {
        let loader = Self::new();
        loader.extensions.insert(".json", extension_loader(load_json));
        loader.extensions.insert(".toml", extension_loader(load_toml));
        loader
    }

    pub fn cache(&self) -> &Table<Module> {
        &self.cache
    }

    pub fn extensions(&self) -> &Table<LoaderFn> {
        &self.extensions
    }

    /// Resolve a module specifier against a base directory
    pub fn resolve(base: &Path, specifier: &str) -> PathBuf {
        let path = Path::new(specifier);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }

    /// Return the cached module for `path`, loading and caching it on a miss
    pub fn require(&self, path: &Path) -> Result<Handle<Module>> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let key = path.to_string_lossy().to_string();

        if let Some(module) = self.cache.get(&key) {
            trace!("Module cache hit: {}", key);
            return Ok(module);
        }

        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let loader = self
            .extensions
            .get(&extension)
            .ok_or_else(|| Error::UnknownExtension(format!("{extension:?} ({key})")))?;

        let source = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ModuleNotFound(key.clone()),
            _ => Error::Io(e),
        })?;

        debug!("Loading module {} with {} loader", key, extension);
        let module = Handle::new((*loader)(&path, &source)?);
        self.cache.insert(key, module.clone());
        Ok(module)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for Loader {
    fn cache(&self) -> &dyn KeyedRegistry<Module> {
        &self.cache
    }

    fn extensions(&self) -> &dyn KeyedRegistry<LoaderFn> {
        &self.extensions
    }
}

fn load_json(path: &Path, source: &str) -> Result<Module> {
    let exports = serde_json::from_str(source)?;
    Ok(Module::with_exports(path, exports))
}

fn load_toml(path: &Path, source: &str) -> Result<Module> {
    let table: toml::Table = toml::from_str(source)?;
    Ok(Module::with_exports(path, serde_json::to_value(table)?))
}

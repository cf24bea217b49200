//! Global namespace shared by every plugin run

use crate::error::{Error, Result};
use crate::snapshot::GlobalNamespace;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct Property {
    value: Value,
    configurable: bool,
}

#[derive(Debug, Default)]
pub struct GlobalObject {
    properties: RwLock<BTreeMap<String, Property>>,
}

impl GlobalObject {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Property>> {
        self.properties.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Property>> {
        self.properties.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.read().get(name).map(|p| p.value.clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Assign a property, keeping the configurability of an existing one
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.write()
            .entry(name.into())
            .and_modify(|p| p.value = value.clone())
            .or_insert(Property {
                value,
                configurable: true,
            });
    }

    /// Define a property that cannot be deleted
    pub fn define_non_configurable(&self, name: impl Into<String>, value: Value) {
        self.write().insert(
            name.into(),
            Property {
                value,
                configurable: false,
            },
        );
    }

    /// Delete a property; returns whether it existed
    pub fn delete(&self, name: &str) -> Result<bool> {
        let mut properties = self.write();
        match properties.get(name) {
            None => Ok(false),
            Some(p) if !p.configurable => Err(Error::NonConfigurable(name.to_string())),
            Some(_) => {
                properties.remove(name);
                Ok(true)
            }
        }
    }

    pub fn property_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }
}

impl GlobalNamespace for GlobalObject {
    fn property_names(&self) -> Vec<String> {
        GlobalObject::property_names(self)
    }

    fn delete_property(&self, name: &str) -> Result<()> {
        self.delete(name).map(|_| ())
    }
}

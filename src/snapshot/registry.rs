//! Capabilities a snapshot needs from the registries it protects

use crate::error::Result;
use crate::runtime::{Handle, Listener, LoaderFn, Module};

/// A string-keyed registry whose values are compared by handle identity
pub trait KeyedRegistry<V: ?Sized>: Send + Sync {
    fn entries(&self) -> Vec<(String, Handle<V>)>;

    fn set(&self, key: &str, value: Handle<V>) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;
}

/// Loader exposing its module cache and its extension loader table
pub trait ModuleLoader: Send + Sync {
    fn cache(&self) -> &dyn KeyedRegistry<Module>;

    fn extensions(&self) -> &dyn KeyedRegistry<LoaderFn>;
}

/// Event source with per-event ordered listener lists
pub trait ListenerRegistry: Send + Sync {
    fn event_names(&self) -> Vec<String>;

    fn listeners(&self, event: &str) -> Vec<Listener>;

    fn add_listener(&self, event: &str, listener: Listener) -> Result<()>;

    /// Remove a single occurrence of `listener`
    fn remove_listener(&self, event: &str, listener: &Listener) -> Result<()>;

    fn remove_all_listeners(&self, event: &str) -> Result<()>;
}

/// Global object whose own property names can be listed and deleted
pub trait GlobalNamespace: Send + Sync {
    fn property_names(&self) -> Vec<String>;

    fn delete_property(&self, name: &str) -> Result<()>;
}

/// Receives one message per change applied during a restore.
///
/// A message arrives as fragments; joined with single spaces they form the
/// text, e.g. `["removing", "/a/b", "from", "require cache"]`.
pub trait AuditSink: Send + Sync {
    fn log(&self, fragments: &[&str]);
}

impl<F> AuditSink for F
where
    F: Fn(&[&str]) + Send + Sync,
{
    fn log(&self, fragments: &[&str]) {
        self(fragments)
    }
}

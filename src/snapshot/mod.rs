//! Snapshot and restore of process-wide registries
//!
//! A [`ProcessSnapshot`] records which modules are cached, which extension
//! loaders are installed, which listeners are registered and which global
//! properties exist. [`ProcessSnapshot::restore`] later puts the registries
//! back, reporting every change through an [`AuditSink`].
//!
//! Only registry entries are tracked. Values are captured as handles, so a
//! module whose exports were mutated in place is still "the same" module.
//!
//! ```ignore
//! let snapshot = host.snapshot(Arc::new(TracingSink));
//! let outcome = plugin.transform(&source, &context).await;
//! snapshot.restore()?;
//! ```

use crate::error::Result;
use crate::runtime::{Handle, Listener, LoaderFn, Module};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub mod diff;
pub mod registry;

pub use diff::{KeyedChange, ListenerDiff};
pub use registry::{AuditSink, GlobalNamespace, KeyedRegistry, ListenerRegistry, ModuleLoader};

pub const REQUIRE_CACHE: &str = "require cache";
pub const REQUIRE_EXTENSIONS: &str = "require extensions";
pub const GLOBAL: &str = "global";

/// Baseline capture of the host registries
pub struct ProcessSnapshot {
    loader: Arc<dyn ModuleLoader>,
    events: Arc<dyn ListenerRegistry>,
    global: Arc<dyn GlobalNamespace>,
    sink: Arc<dyn AuditSink>,
    cache: Vec<(String, Handle<Module>)>,
    extensions: Vec<(String, Handle<LoaderFn>)>,
    listeners: Vec<(String, Vec<Listener>)>,
    globals: BTreeSet<String>,
}

impl ProcessSnapshot {
    /// Capture the current state of the given registries.
    ///
    /// The capture is a copy of keys and handles; later changes to the live
    /// registries do not affect it.
    pub fn new(
        loader: Arc<dyn ModuleLoader>,
        events: Arc<dyn ListenerRegistry>,
        global: Arc<dyn GlobalNamespace>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        let cache = loader.cache().entries();
        let extensions = loader.extensions().entries();
        let listeners = capture_listeners(events.as_ref());
        let globals = global.property_names().into_iter().collect();

        let snapshot = Self {
            loader,
            events,
            global,
            sink,
            cache,
            extensions,
            listeners,
            globals,
        };
        debug!(
            "Captured snapshot: {} cached module(s), {} extension(s), {} event(s), {} global(s)",
            snapshot.cache.len(),
            snapshot.extensions.len(),
            snapshot.listeners.len(),
            snapshot.globals.len()
        );
        snapshot
    }

    /// Revert every registry to its captured state.
    ///
    /// Each category is restored even when an earlier one fails; the first
    /// error is returned once all of them have run.
    pub fn restore(self) -> Result<()> {
        let outcomes = [
            self.restore_keyed(self.loader.cache(), REQUIRE_CACHE, &self.cache),
            self.restore_keyed(
                self.loader.extensions(),
                REQUIRE_EXTENSIONS,
                &self.extensions,
            ),
            self.restore_listeners(),
            self.restore_globals(),
        ];
        outcomes.into_iter().collect()
    }

    fn restore_keyed<V: ?Sized>(
        &self,
        registry: &dyn KeyedRegistry<V>,
        label: &str,
        baseline: &[(String, Handle<V>)],
    ) -> Result<()> {
        for change in diff::diff_keyed(baseline, &registry.entries()) {
            match change {
                KeyedChange::Restore { key, value } => {
                    registry.set(&key, value)?;
                    self.sink.log(&["restoring deleted", key.as_str(), "to", label]);
                }
                KeyedChange::Replace { key, value } => {
                    registry.set(&key, value)?;
                    self.sink.log(&["restoring replaced", key.as_str(), "in", label]);
                }
                KeyedChange::Remove { key } => {
                    registry.delete(&key)?;
                    self.sink.log(&["removing", key.as_str(), "from", label]);
                }
            }
        }
        Ok(())
    }

    fn restore_listeners(&self) -> Result<()> {
        let current = capture_listeners(self.events.as_ref());

        for change in diff::diff_listeners(&self.listeners, &current) {
            let event = format!("'{}'", change.event);

            if change.baseline_empty {
                // Nothing was registered before, so everything present is an addition.
                self.events.remove_all_listeners(&change.event)?;
                self.sink.log(&["removing all", event.as_str(), "event listeners"]);
            } else {
                for listener in &change.added {
                    self.events.remove_listener(&change.event, listener)?;
                    self.sink.log(&["removing added", event.as_str(), "event listener"]);
                }
            }

            for listener in change.removed {
                self.events.add_listener(&change.event, listener)?;
                self.sink.log(&["restoring removed", event.as_str(), "event listener"]);
            }
        }
        Ok(())
    }

    fn restore_globals(&self) -> Result<()> {
        for name in diff::added_names(&self.globals, &self.global.property_names()) {
            self.global.delete_property(&name)?;
            self.sink.log(&["removing", name.as_str(), "from", GLOBAL]);
        }
        Ok(())
    }
}

fn capture_listeners(events: &dyn ListenerRegistry) -> Vec<(String, Vec<Listener>)> {
    events
        .event_names()
        .into_iter()
        .map(|event| {
            let listeners = events.listeners(&event);
            (event, listeners)
        })
        .collect()
}

/// Forwards restore messages to `tracing` at debug level
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn log(&self, fragments: &[&str]) {
        debug!(target: "codemod::snapshot", "{}", fragments.join(" "));
    }
}

/// Keeps every restore message in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AuditSink for RecordingSink {
    fn log(&self, fragments: &[&str]) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(fragments.join(" "));
    }
}

//! Process-wide event emitter

use crate::error::Result;
use crate::snapshot::ListenerRegistry;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

use super::Handle;

pub type ListenerFn = dyn Fn(&serde_json::Value) + Send + Sync;

pub type Listener = Handle<ListenerFn>;

/// Wrap a closure as a listener handle
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&serde_json::Value) + Send + Sync + 'static,
{
    let inner: Arc<ListenerFn> = Arc::new(f);
    Handle::from_arc(inner)
}

/// Ordered listener lists keyed by event name.
///
/// Events keep the order in which they were first registered, and an event
/// disappears from [`EventEmitter::event_names`] once its last listener is gone.
#[derive(Default)]
pub struct EventEmitter {
    events: RwLock<Vec<(String, Vec<Listener>)>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<(String, Vec<Listener>)>> {
        self.events.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(String, Vec<Listener>)>> {
        self.events.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a listener; the same handle may be registered more than once
    pub fn on(&self, event: &str, listener: Listener) {
        let mut events = self.write();
        match events.iter_mut().find(|(name, _)| name == event) {
            Some((_, listeners)) => listeners.push(listener),
            None => events.push((event.to_string(), vec![listener])),
        }
    }

    /// Remove the most recently added occurrence of `listener`.
    ///
    /// Returns false when the listener was not registered for `event`.
    pub fn off(&self, event: &str, listener: &Listener) -> bool {
        let mut events = self.write();
        let Some(slot) = events.iter().position(|(name, _)| name == event) else {
            return false;
        };

        let listeners = &mut events[slot].1;
        let Some(index) = listeners.iter().rposition(|l| l.ptr_eq(listener)) else {
            return false;
        };
        listeners.remove(index);

        if listeners.is_empty() {
            events.remove(slot);
        }
        true
    }

    /// Drop every listener for `event`, or for all events when `None`
    pub fn off_all(&self, event: Option<&str>) {
        let mut events = self.write();
        match event {
            Some(event) => events.retain(|(name, _)| name != event),
            None => events.clear(),
        }
    }

    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.read()
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, listeners)| listeners.clone())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.read()
            .iter()
            .find(|(name, _)| name == event)
            .map_or(0, |(_, listeners)| listeners.len())
    }

    pub fn event_names(&self) -> Vec<String> {
        self.read().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Call every listener for `event` in registration order.
    ///
    /// Listeners run against a copy of the list, so they may add or remove
    /// listeners without affecting the current dispatch.
    pub fn emit(&self, event: &str, payload: &serde_json::Value) -> usize {
        let listeners = self.listeners(event);
        trace!("Emitting '{}' to {} listener(s)", event, listeners.len());
        for listener in &listeners {
            (**listener)(payload);
        }
        listeners.len()
    }
}

impl ListenerRegistry for EventEmitter {
    fn event_names(&self) -> Vec<String> {
        EventEmitter::event_names(self)
    }

    fn listeners(&self, event: &str) -> Vec<Listener> {
        EventEmitter::listeners(self, event)
    }

    fn add_listener(&self, event: &str, listener: Listener) -> Result<()> {
        self.on(event, listener);
        Ok(())
    }

    fn remove_listener(&self, event: &str, listener: &Listener) -> Result<()> {
        self.off(event, listener);
        Ok(())
    }

    fn remove_all_listeners(&self, event: &str) -> Result<()> {
        self.off_all(Some(event));
        Ok(())
    }
}

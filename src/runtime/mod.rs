//! In-process host runtime that plugins run against
//!
//! The host owns the registries a transformation can pollute: the module
//! loader (cache and extension table), the process event emitter and the
//! global object. Each is shared through an `Arc` so plugins, the runner and
//! an active [`ProcessSnapshot`] can all hold it at once.

use crate::error::Result;
use crate::snapshot::{AuditSink, ProcessSnapshot};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

pub mod events;
pub mod global;
pub mod handle;
pub mod loader;

pub use events::{listener, EventEmitter, Listener, ListenerFn};
pub use global::GlobalObject;
pub use handle::Handle;
pub use loader::{extension_loader, ExtensionLoader, Loader, LoaderFn, Module, Table};

#[derive(Clone)]
pub struct Host {
    pub loader: Arc<Loader>,
    pub process: Arc<EventEmitter>,
    pub global: Arc<GlobalObject>,
}

impl Host {
    /// Create a host with the built-in `.json` and `.toml` loaders installed
    pub fn new() -> Self {
        Self {
            loader: Arc::new(Loader::with_builtin_extensions()),
            process: Arc::new(EventEmitter::new()),
            global: Arc::new(GlobalObject::new()),
        }
    }

    /// Capture the current state of every registry this host owns
    pub fn snapshot(&self, sink: Arc<dyn AuditSink>) -> ProcessSnapshot {
        ProcessSnapshot::new(
            self.loader.clone(),
            self.process.clone(),
            self.global.clone(),
            sink,
        )
    }

    /// Run `scope` between a snapshot and its restore.
    ///
    /// The restore happens whether or not `scope` fails. When both fail, the
    /// scope's error wins and the restore error is logged.
    pub async fn isolate<T, F>(&self, sink: Arc<dyn AuditSink>, scope: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let snapshot = self.snapshot(sink);
        let outcome = scope.await;
        let restored = snapshot.restore();

        match (outcome, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                warn!("Restore after failed run also failed: {}", restore_err);
                Err(e)
            }
        }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

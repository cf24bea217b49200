//! # Codemod
//!
//! Applies transformation plugins to many source files in one long-lived
//! process, rolling back the side effects each plugin run leaves behind.
//!
//! ## Usage
//!
//! ```bash
//! codemod --plugin rename.toml -o rename='{"to": "bar"}' src/
//! ```
//!
//! ## Modules
//!
//! - `snapshot` - Captures and restores the host registries around a plugin run
//! - `runtime` - Host registries: module loader, event emitter, global object
//! - `plugin` - Plugin trait, manifest plugins, loading and registration
//! - `config` - Command line options and `codemod.toml`
//! - `sources` - Source file discovery
//! - `runner` - Applies plugins to every source file in isolation
pub mod config;
pub mod error;
pub mod plugin;
pub mod runner;
pub mod runtime;
pub mod snapshot;
pub mod sources;

pub use error::{Error, Result};
pub use runtime::Host;
pub use snapshot::ProcessSnapshot;

//! # File Organizer
//!
//! A safe, reversible file organizer: it plans where files should go,
//! checks the plan, snapshots the sources and only then moves anything.
//!
//! ## Core Philosophy
//! - **Nothing moves unchecked** - plans are validated before execution
//! - **Every batch can be undone** - operations are logged and reversible
//! - **Explain decisions** - each planned move carries its reasoning
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Rules, planning, execution, backups, undo, duplicate detection
//! - `config` - Organizer settings with defaults
//! - `events` - Event-driven progress reporting
//! - `error` - User-friendly error types
//!
//! The command-line front end lives in the `file-organize` binary.

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use crate::config::OrganizerConfig;
pub use crate::core::Organizer;
pub use crate::error::{OrganizerError, Result};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the library
///
/// Called by the application entry point. `RUST_LOG` wins when set,
/// otherwise only warnings are shown. Calling it twice is harmless.
pub fn init_tracing() {
    init_tracing_with_default("warn");
}

/// Initialize tracing with `default_filter` used when `RUST_LOG` is unset
pub fn init_tracing_with_default(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

//! Lifecycle management for the host binary.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build pool → Start diagnostics + watcher
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → trigger → diagnostics server drains, watcher loop exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;

//! Background Tasks Module
//!
//! Tasks that run for the lifetime of the server.
//!
//! # Tasks
//! - Cache cleanup: expires and evicts entries at the configured interval

mod cleanup;

pub use cleanup::{backoff_delay, spawn_cleanup_task, CleanupTask, MAX_BACKOFF};

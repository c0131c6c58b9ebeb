//! Trace script replay
//!
//! This module provides:
//! - [`engine`]: the [`Replay`] driver and its snapshot history
//! - [`errors`]: replay error types
//!
//! # Execution Model
//!
//! The replay binds one guest heap over a fresh region, then runs every
//! statement of the script through the host's import table. A snapshot is
//! taken before the first statement and after each one; the history can then
//! be walked forward and backward without re-running anything.
//!
//! Allocator diagnostics (exhaustion, `free(0)`, unknown addresses, chain
//! problems) are drained after each statement and end up in the event log
//! alongside the call results.

pub mod engine;
pub mod errors;

pub use engine::Replay;
pub use errors::ReplayError;

//! Steer – out-of-band remote control for long-running training loops
//!
//! This crate implements a file-backed command queue with:
//! - Commands deposited by an external operator into a shared JSON store
//! - A dispatcher driven once per host step behind a recurring trigger
//! - Epoch/iteration scheduling with exact-match semantics
//! - A pluggable receiver registry with snapshot and hyperparameter defaults
//! - At-most-once execution and failure isolation between receivers

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Command queue, store, and dispatcher
pub mod commands;

// Re-export key types for convenience
pub use commands::{CommandsConfig, Dispatcher};

/// Current version of the Steer crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

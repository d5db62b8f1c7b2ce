//! Host collaborator interface
//!
//! The training loop that embeds the dispatcher exposes its progress counters,
//! its optimizers, and a snapshot primitive through these traits.

use anyhow::{Result, anyhow};
use std::collections::BTreeMap;

/// The long-running process driving the dispatcher
pub trait Host {
    /// Current epoch count (monotonic non-decreasing)
    fn epoch(&self) -> u64;

    /// Current iteration count (monotonic non-decreasing)
    fn iteration(&self) -> u64;

    /// Seconds since training started, if tracked
    fn elapsed_time(&self) -> Option<f64> {
        None
    }

    /// Look up an optimizer by name (the default one is `"main"`)
    fn optimizer(&mut self, name: &str) -> Option<&mut dyn Optimizer>;

    /// Persist full training state to a file with the given name
    fn save_snapshot(&mut self, file_name: &str) -> Result<()> {
        Err(anyhow!(
            "host does not support snapshots (requested {})",
            file_name
        ))
    }
}

/// Optimizer exposing numeric hyperparameters
pub trait Optimizer {
    /// Read a hyperparameter
    fn hyperparam(&self, key: &str) -> Option<f64>;

    /// Write a hyperparameter
    fn set_hyperparam(&mut self, key: &str, value: f64) -> Result<()>;
}

/// In-memory hyperparameter table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HyperParams {
    values: BTreeMap<String, f64>,
}

impl HyperParams {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Iterate over all hyperparameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

impl Optimizer for HyperParams {
    fn hyperparam(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    fn set_hyperparam(&mut self, key: &str, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(anyhow!("hyperparameter '{}' must be finite, got {}", key, value));
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

//! Recurring trigger deciding when the dispatcher looks at the store

use serde::{Deserialize, Serialize};

use super::error::{CommandsError, Result};
use super::schedule::Progress;

/// Unit of a trigger period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerUnit {
    /// Every N iterations
    Iteration,
    /// Every N epochs
    Epoch,
}

/// Serializable trigger configuration, e.g. `(1, iteration)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Period in `unit`s; must be non-zero
    pub period: u64,
    /// Counter the period applies to
    pub unit: TriggerUnit,
}

impl TriggerSpec {
    /// Fire every `period` iterations
    pub fn iterations(period: u64) -> Self {
        Self {
            period,
            unit: TriggerUnit::Iteration,
        }
    }

    /// Fire every `period` epochs
    pub fn epochs(period: u64) -> Self {
        Self {
            period,
            unit: TriggerUnit::Epoch,
        }
    }
}

impl Default for TriggerSpec {
    fn default() -> Self {
        Self::iterations(1)
    }
}

/// Stateful interval trigger
#[derive(Debug, Clone)]
pub struct IntervalTrigger {
    spec: TriggerSpec,
    previous_epoch: u64,
}

impl IntervalTrigger {
    /// Build a trigger, rejecting a zero period
    pub fn new(spec: TriggerSpec) -> Result<Self> {
        if spec.period == 0 {
            return Err(CommandsError::Config(
                "trigger period must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            spec,
            previous_epoch: 0,
        })
    }

    /// Trigger configuration
    pub fn spec(&self) -> TriggerSpec {
        self.spec
    }

    /// Whether the trigger fires at `progress`.
    ///
    /// Epoch triggers fire once when a new multiple of the period is reached,
    /// however many times they are evaluated within that epoch.
    pub fn fire(&mut self, progress: Progress) -> bool {
        let period = self.spec.period;
        match self.spec.unit {
            TriggerUnit::Iteration => progress.iteration % period == 0,
            TriggerUnit::Epoch => {
                let crossed = progress.epoch / period != self.previous_epoch / period;
                self.previous_epoch = progress.epoch;
                crossed
            }
        }
    }
}

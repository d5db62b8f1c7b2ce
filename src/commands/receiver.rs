//! Receivers: handlers that execute commands against the host
//!
//! A receiver takes the host and the request body and returns an optional
//! response body. Errors are folded into a `failure` response by the dispatcher.

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use std::sync::Arc;

use super::host::Host;

/// Name of the built-in snapshot receiver
pub const TAKE_SNAPSHOT: &str = "take_snapshot";

/// Name of the built-in hyperparameter receiver
pub const ADJUST_HYPERPARAMS: &str = "adjust_hyperparams";

/// Optimizer adjusted by [`AdjustHyperparams`]
pub const MAIN_OPTIMIZER: &str = "main";

/// Handler invoked for a command name
pub trait Receiver: Send + Sync {
    /// Execute against the host with the command's request body
    fn execute(&self, host: &mut dyn Host, body: Option<&Value>) -> Result<Option<Value>>;
}

/// Shared receiver handle stored in registries
pub type ReceiverRef = Arc<dyn Receiver>;

/// Adapter turning a closure into a [`Receiver`]
pub struct FnReceiver<F>(pub F);

impl<F> Receiver for FnReceiver<F>
where
    F: Fn(&mut dyn Host, Option<&Value>) -> Result<Option<Value>> + Send + Sync,
{
    fn execute(&self, host: &mut dyn Host, body: Option<&Value>) -> Result<Option<Value>> {
        (self.0)(host, body)
    }
}

/// Saves a snapshot named after the current iteration
#[derive(Debug, Clone, Copy, Default)]
pub struct TakeSnapshot;

impl TakeSnapshot {
    /// File name used for a snapshot taken at `iteration`
    pub fn file_name(iteration: u64) -> String {
        format!("snapshot_iter_{}", iteration)
    }
}

impl Receiver for TakeSnapshot {
    fn execute(&self, host: &mut dyn Host, _body: Option<&Value>) -> Result<Option<Value>> {
        let file_name = Self::file_name(host.iteration());
        host.save_snapshot(&file_name)
            .with_context(|| format!("Failed to save snapshot {}", file_name))?;
        Ok(None)
    }
}

/// Sets numeric attributes on the main optimizer.
///
/// The body must be an object; null values are skipped. The whole body is
/// validated before anything is written, so a bad entry leaves the optimizer
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustHyperparams;

impl Receiver for AdjustHyperparams {
    fn execute(&self, host: &mut dyn Host, body: Option<&Value>) -> Result<Option<Value>> {
        let mut updates = Vec::new();
        match body {
            None => bail!("{} requires a body of hyperparameters", ADJUST_HYPERPARAMS),
            Some(Value::Object(entries)) => {
                for (key, value) in entries {
                    if value.is_null() {
                        continue;
                    }
                    let number = value.as_f64().ok_or_else(|| {
                        anyhow!("hyperparameter '{}' must be numeric, got {}", key, value)
                    })?;
                    updates.push((key.as_str(), number));
                }
            }
            Some(other) => bail!("expected an object of hyperparameters, got {}", other),
        }

        let optimizer = host
            .optimizer(MAIN_OPTIMIZER)
            .ok_or_else(|| anyhow!("host has no '{}' optimizer", MAIN_OPTIMIZER))?;

        for (key, value) in updates {
            optimizer.set_hyperparam(key, value)?;
        }

        Ok(Some(json!({
            "lr": optimizer.hyperparam("lr"),
            "momentum": optimizer.hyperparam("momentum"),
        })))
    }
}

/// Built-in receivers, keyed by command name
pub fn default_receivers() -> Vec<(&'static str, ReceiverRef)> {
    vec![
        (TAKE_SNAPSHOT, Arc::new(TakeSnapshot) as ReceiverRef),
        (ADJUST_HYPERPARAMS, Arc::new(AdjustHyperparams) as ReceiverRef),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::host::{HyperParams, Optimizer};

    #[derive(Default)]
    struct StubHost {
        iteration: u64,
        params: Option<HyperParams>,
        snapshots: Vec<String>,
    }

    impl Host for StubHost {
        fn epoch(&self) -> u64 {
            0
        }

        fn iteration(&self) -> u64 {
            self.iteration
        }

        fn optimizer(&mut self, name: &str) -> Option<&mut dyn Optimizer> {
            match (name, self.params.as_mut()) {
                ("main", Some(params)) => Some(params as &mut dyn Optimizer),
                _ => None,
            }
        }

        fn save_snapshot(&mut self, file_name: &str) -> Result<()> {
            self.snapshots.push(file_name.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_take_snapshot_uses_iteration() {
        let mut host = StubHost {
            iteration: 42,
            ..Default::default()
        };

        let body = TakeSnapshot.execute(&mut host, None).unwrap();

        assert!(body.is_none());
        assert_eq!(host.snapshots, vec!["snapshot_iter_42".to_string()]);
    }

    #[test]
    fn test_adjust_reports_lr_and_momentum() {
        let mut host = StubHost {
            params: Some(HyperParams::new().with("lr", 0.1).with("momentum", 0.9)),
            ..Default::default()
        };

        let body = json!({"lr": 0.01, "momentum": null});
        let result = AdjustHyperparams.execute(&mut host, Some(&body)).unwrap();

        assert_eq!(result, Some(json!({"lr": 0.01, "momentum": 0.9})));
    }

    #[test]
    fn test_adjust_rejects_non_numeric_without_partial_write() {
        let mut host = StubHost {
            params: Some(HyperParams::new().with("lr", 0.1)),
            ..Default::default()
        };

        let body = json!({"lr": 0.5, "schedule": "cosine"});
        assert!(AdjustHyperparams.execute(&mut host, Some(&body)).is_err());
        assert_eq!(host.params.unwrap().hyperparam("lr"), Some(0.1));
    }

    #[test]
    fn test_adjust_requires_main_optimizer() {
        let mut host = StubHost::default();
        let body = json!({"lr": 0.01});
        assert!(AdjustHyperparams.execute(&mut host, Some(&body)).is_err());
    }

    #[test]
    fn test_adjust_without_body_fails() {
        let mut host = StubHost {
            params: Some(HyperParams::new().with("lr", 0.1)),
            ..Default::default()
        };

        assert!(AdjustHyperparams.execute(&mut host, None).is_err());
        assert_eq!(host.params.unwrap().hyperparam("lr"), Some(0.1));
    }

    #[test]
    fn test_fn_receiver_forwards_body() {
        let echo = FnReceiver(|_host: &mut dyn Host, body: Option<&Value>| {
            Ok::<_, anyhow::Error>(body.cloned())
        });
        let mut host = StubHost::default();

        let result = echo.execute(&mut host, Some(&json!([1, 2]))).unwrap();
        assert_eq!(result, Some(json!([1, 2])));
    }
}

//! Dispatcher: the per-step entry point
//!
//! On every trigger firing the dispatcher loads the store, runs each pending
//! command whose schedule is satisfied, attaches a response, and writes the
//! store back only if something was answered. Receiver failures are recorded
//! on the command and never reach the host.

use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};

use super::CommandsConfig;
use super::CorruptStorePolicy;
use super::error::{CommandsError, ExecutionError, Result, StoreError};
use super::host::Host;
use super::receiver::Receiver;
use super::record::{CommandRecord, Response, ResponseStatus};
use super::registry::ReceiverRegistry;
use super::schedule::{Progress, should_execute};
use super::storage::CommandStore;
use super::trigger::IntervalTrigger;

/// Lifecycle of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Constructed; the store has not been cleared yet
    Uninitialized,
    /// Store cleared for this run; `step` may be called
    Active,
}

/// Result of executing one command in a pass
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Position of the record in the store
    pub index: usize,
    /// Command name
    pub name: String,
    /// Recorded status
    pub status: ResponseStatus,
}

/// Summary of a single `step` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Whether the trigger was due
    pub fired: bool,
    /// Commands answered in this pass, in store order
    pub executed: Vec<ExecutionOutcome>,
    /// Whether the store was written
    pub persisted: bool,
}

impl DispatchReport {
    /// Number of commands answered with `success`
    pub fn succeeded(&self) -> usize {
        self.count(ResponseStatus::Success)
    }

    /// Number of commands answered with `failure`
    pub fn failed(&self) -> usize {
        self.count(ResponseStatus::Failure)
    }

    fn count(&self, status: ResponseStatus) -> usize {
        self.executed.iter().filter(|o| o.status == status).count()
    }
}

/// Command dispatcher embedded in a host's step loop
#[derive(Debug)]
pub struct Dispatcher {
    config: CommandsConfig,
    store: CommandStore,
    registry: ReceiverRegistry,
    trigger: IntervalTrigger,
    state: DispatcherState,
}

impl Dispatcher {
    /// Create a dispatcher with the built-in receivers
    pub fn new(config: CommandsConfig) -> Result<Self> {
        Self::with_receivers(config, &ReceiverRegistry::new())
    }

    /// Create a dispatcher with the built-in receivers overridden or extended
    /// by `overrides`
    pub fn with_receivers(config: CommandsConfig, overrides: &ReceiverRegistry) -> Result<Self> {
        let trigger = IntervalTrigger::new(config.trigger)?;

        let mut registry = ReceiverRegistry::with_defaults();
        registry.extend(overrides);

        Ok(Self {
            store: config.store(),
            config,
            registry,
            trigger,
            state: DispatcherState::Uninitialized,
        })
    }

    /// Clear any store left over from a previous run
    pub fn initialize(&mut self) -> Result<()> {
        self.store.remove()?;
        self.state = DispatcherState::Active;
        Ok(())
    }

    /// Run one dispatch pass if the trigger is due.
    ///
    /// Receivers run before the store is written. If that write fails, their
    /// side effects stand but the responses are lost, and the same commands
    /// run again on the next pass.
    pub fn step(&mut self, host: &mut dyn Host) -> Result<DispatchReport> {
        if self.state != DispatcherState::Active {
            return Err(CommandsError::NotInitialized);
        }

        let progress = Progress::of(host);
        if !self.trigger.fire(progress) {
            tracing::debug!(
                "Trigger not due at epoch {} iteration {}",
                progress.epoch,
                progress.iteration
            );
            return Ok(DispatchReport::default());
        }

        let mut report = DispatchReport {
            fired: true,
            ..DispatchReport::default()
        };

        let mut records = match self.store.load() {
            Ok(records) => records,
            Err(StoreError::Corrupt { path, detail })
                if self.config.corrupt_store_policy == CorruptStorePolicy::Skip =>
            {
                tracing::warn!("Skipping corrupt command store {:?}: {}", path, detail);
                return Ok(report);
            }
            Err(e) => return Err(e.into()),
        };

        for (index, record) in records.iter_mut().enumerate() {
            if !should_execute(record, progress) {
                if !record.is_answered() {
                    tracing::debug!(
                        "Skipping command {} ({}): schedule not met",
                        index,
                        record.name()
                    );
                }
                continue;
            }

            let response = match self.execute(host, record) {
                Ok(body) => Response::success(body),
                Err(e) => {
                    tracing::warn!("Command {} ({}) failed: {}", index, record.name(), e);
                    Response::failure()
                }
            };
            let response = response.stamped(progress, host.elapsed_time());
            let status = response.status;

            if record.answer(response) {
                tracing::info!(
                    "Executed command {} ({}) at iteration {}: {}",
                    index,
                    record.name(),
                    progress.iteration,
                    status
                );
                report.executed.push(ExecutionOutcome {
                    index,
                    name: record.name().to_string(),
                    status,
                });
            }
        }

        if !report.executed.is_empty() {
            self.store.save(&records)?;
            report.persisted = true;
            tracing::debug!(
                "Persisted {} commands to {:?}",
                records.len(),
                self.store.path()
            );
        }

        Ok(report)
    }

    /// End-of-run hook
    pub fn finalize(&mut self) {}

    /// Register a receiver, replacing any with the same name
    pub fn add_receiver<R>(&mut self, name: impl Into<String>, receiver: R) -> Result<()>
    where
        R: Receiver + 'static,
    {
        self.registry.register(name, receiver)?;
        Ok(())
    }

    /// Register a closure as a receiver
    pub fn add_receiver_fn<F>(&mut self, name: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(&mut dyn Host, Option<&Value>) -> anyhow::Result<Option<Value>>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register_fn(name, handler)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn config(&self) -> &CommandsConfig {
        &self.config
    }

    /// Get the command store
    pub fn store(&self) -> &CommandStore {
        &self.store
    }

    /// Get the receiver registry
    pub fn registry(&self) -> &ReceiverRegistry {
        &self.registry
    }

    /// Get the lifecycle state
    pub fn state(&self) -> DispatcherState {
        self.state
    }

    fn execute(
        &self,
        host: &mut dyn Host,
        record: &CommandRecord,
    ) -> std::result::Result<Option<Value>, ExecutionError> {
        let name = record.name();
        let receiver = self
            .registry
            .get(name)
            .ok_or_else(|| ExecutionError::NotFound(name.to_string()))?;
        let body = record.request().body.as_ref();

        match panic::catch_unwind(AssertUnwindSafe(|| receiver.execute(host, body))) {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(error)) => Err(ExecutionError::Failed {
                name: name.to_string(),
                error,
            }),
            Err(payload) => Err(ExecutionError::Panicked {
                name: name.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

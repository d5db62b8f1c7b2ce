//! Receiver registry
//!
//! Maps command names to receivers. Each dispatcher owns its registry: the
//! built-in receivers are copied in at construction and then overridden or
//! extended by the embedder. Nothing is shared between dispatchers.

use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{RegistryError, RegistryResult};
use super::host::Host;
use super::receiver::{FnReceiver, Receiver, ReceiverRef, default_receivers};

/// Name-to-receiver mapping owned by a dispatcher
#[derive(Clone, Default)]
pub struct ReceiverRegistry {
    receivers: HashMap<String, ReceiverRef>,
}

impl ReceiverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in receivers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (name, receiver) in default_receivers() {
            registry.receivers.insert(name.to_string(), receiver);
        }
        registry
    }

    /// Register a receiver, replacing any receiver with the same name
    pub fn register<R>(&mut self, name: impl Into<String>, receiver: R) -> RegistryResult<()>
    where
        R: Receiver + 'static,
    {
        self.register_shared(name, Arc::new(receiver))
    }

    /// Register a closure as a receiver
    pub fn register_fn<F>(&mut self, name: impl Into<String>, handler: F) -> RegistryResult<()>
    where
        F: Fn(&mut dyn Host, Option<&Value>) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.register(name, FnReceiver(handler))
    }

    /// Register an already shared receiver
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        receiver: ReceiverRef,
    ) -> RegistryResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidReceiver(
                "command name is not given".to_string(),
            ));
        }

        if self.receivers.insert(name.clone(), receiver).is_some() {
            tracing::debug!("Replaced receiver for command '{}'", name);
        }
        Ok(())
    }

    /// Copy every receiver from `other` into this registry, overriding by name
    pub fn extend(&mut self, other: &ReceiverRegistry) {
        for (name, receiver) in &other.receivers {
            self.receivers.insert(name.clone(), Arc::clone(receiver));
        }
    }

    /// Look up the receiver for a command name
    pub fn get(&self, name: &str) -> Option<ReceiverRef> {
        self.receivers.get(name).cloned()
    }

    /// Check whether a receiver is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.receivers.contains_key(name)
    }

    /// List registered command names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.receivers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered receivers
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    /// Whether no receivers are registered
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

impl std::fmt::Debug for ReceiverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverRegistry")
            .field("receivers", &self.names())
            .finish()
    }
}

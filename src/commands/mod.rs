//! Command queue configuration and public API
//!
//! Commands flow from the store, through schedule filtering, into receivers,
//! and back into the store with a response attached. The [`Dispatcher`]
//! drives that cycle once per host step.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// Submodules
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod queue;
pub mod receiver;
pub mod record;
pub mod registry;
pub mod schedule;
pub mod storage;
pub mod trigger;

use error::{CommandsError, Result};
use storage::CommandStore;
use trigger::TriggerSpec;

/// Default store file name inside the output directory
pub const DEFAULT_FILE_NAME: &str = "commands";

/// What a dispatch pass does when the store cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptStorePolicy {
    /// Return the error to the caller of `step`
    #[default]
    Fail,
    /// Log a warning and treat the pass as an empty store
    Skip,
}

/// Configuration for a dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Run output directory holding the store (default: result/)
    pub out_dir: PathBuf,

    /// Store file name inside `out_dir`
    pub file_name: String,

    /// How often the dispatcher looks at the store
    pub trigger: TriggerSpec,

    /// Handling of unparsable store content
    pub corrupt_store_policy: CorruptStorePolicy,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("result"),
            file_name: DEFAULT_FILE_NAME.to_string(),
            trigger: TriggerSpec::default(),
            corrupt_store_policy: CorruptStorePolicy::Fail,
        }
    }
}

impl CommandsConfig {
    /// Configuration for a run writing to `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            ..Self::default()
        }
    }

    /// Override the store file name
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Override the recurring trigger
    pub fn with_trigger(mut self, trigger: TriggerSpec) -> Self {
        self.trigger = trigger;
        self
    }

    /// Override the corrupt-store policy
    pub fn with_corrupt_store_policy(mut self, policy: CorruptStorePolicy) -> Self {
        self.corrupt_store_policy = policy;
        self
    }

    /// Full path of the store file
    pub fn store_path(&self) -> PathBuf {
        self.out_dir.join(&self.file_name)
    }

    /// Store described by this configuration
    pub fn store(&self) -> CommandStore {
        CommandStore::new(self.store_path())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .map_err(|e| CommandsError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        serde_json::from_slice(&data)
            .map_err(|e| CommandsError::Config(format!("Failed to parse {:?}: {}", path, e)))
    }

    /// Write configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(error::StoreError::from)?;
        storage::write_atomic(path, &json)?;
        Ok(())
    }
}

// Re-export commonly used types
pub use dispatcher::{DispatchReport, Dispatcher, ExecutionOutcome};
pub use host::{Host, HyperParams, Optimizer};
pub use queue::CommandQueue;
pub use receiver::{Receiver, ReceiverRef};
pub use record::{CommandRecord, Request, Response, ResponseStatus, Schedule, ScheduleKey};
pub use registry::ReceiverRegistry;
pub use schedule::{Progress, should_execute};

//! Writer-side facade for operators and tools
//!
//! Appends pending commands to a run's store and inspects their responses.
//! Writes follow the same load-modify-replace discipline as the dispatcher.

use chrono::Utc;
use serde_json::Value;

use super::error::StoreResult;
use super::record::{CommandRecord, Schedule};
use super::storage::CommandStore;

/// Command queue over a store
#[derive(Debug, Clone)]
pub struct CommandQueue {
    store: CommandStore,
}

impl CommandQueue {
    /// Create a queue over the given store
    pub fn new(store: CommandStore) -> Self {
        Self { store }
    }

    /// Get the underlying store
    pub fn store(&self) -> &CommandStore {
        &self.store
    }

    /// Append a pending command and return it as written
    pub fn enqueue(
        &self,
        name: impl Into<String>,
        body: Option<Value>,
        schedule: Option<Schedule>,
    ) -> StoreResult<CommandRecord> {
        let mut record = CommandRecord::new(name)
            .with_id(uuid::Uuid::new_v4())
            .with_created_at(Utc::now());
        if let Some(body) = body {
            record = record.with_body(body);
        }
        if let Some(schedule) = schedule {
            record = record.with_schedule(schedule);
        }

        let mut records = self.store.load()?;
        records.push(record.clone());
        self.store.save(&records)?;

        tracing::info!("Enqueued command {} into {:?}", record.name(), self.store.path());
        Ok(record)
    }

    /// All commands, in store order
    pub fn list(&self) -> StoreResult<Vec<CommandRecord>> {
        self.store.load()
    }

    /// Commands that have not been answered yet
    pub fn pending(&self) -> StoreResult<Vec<CommandRecord>> {
        Ok(self
            .store
            .load()?
            .into_iter()
            .filter(|record| !record.is_answered())
            .collect())
    }

    /// Find a command by id
    pub fn find(&self, id: uuid::Uuid) -> StoreResult<Option<CommandRecord>> {
        Ok(self
            .store
            .load()?
            .into_iter()
            .find(|record| record.id() == Some(id)))
    }

    /// Remove the whole store
    pub fn clear(&self) -> StoreResult<()> {
        self.store.remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_enqueue_assigns_id_and_timestamp() {
        let temp = TempDir::new().unwrap();
        let queue = CommandQueue::new(CommandStore::in_dir(temp.path(), "commands"));

        let record = queue.enqueue("take_snapshot", None, None).unwrap();

        assert!(record.id().is_some());
        assert!(record.request().created_at.is_some());
        assert_eq!(queue.find(record.id().unwrap()).unwrap(), Some(record));
    }
}

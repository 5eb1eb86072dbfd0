// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Transfer task store
//
// Pure state container for transfer tasks. No network or timer logic;
// frontends render from snapshots and subscribe for change notices.

use crate::task::{TaskEntry, TransferStatus, TransferTask};
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Capacity of the change feed. Slow subscribers see `Lagged` and should
/// re-read the full list.
const EVENT_CAPACITY: usize = 256;

/// Change notice published after every mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Created(String),
    Updated(String),
    Removed(String),
    Cleared,
}

/// In-memory collection of transfer tasks, most recent first
pub struct TransferStore {
    entries: RwLock<Vec<TaskEntry>>,
    events: broadcast::Sender<StoreEvent>,
}

impl TransferStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Subscribe to change notices
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Add a task at the top of the list
    pub fn create(&self, task: TransferTask) -> String {
        self.insert(TaskEntry::new(task))
    }

    /// Add a prepared entry, e.g. one whose first attempt is already begun
    pub fn insert(&self, entry: TaskEntry) -> String {
        let id = entry.id().to_string();
        {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.insert(0, entry);
        }
        self.publish(StoreEvent::Created(id.clone()));
        id
    }

    /// Apply `patch` to the task with `id` under a single write lock.
    /// Returns `None` if there is no such task. `Updated` is published only
    /// when the patch changed what snapshots show.
    pub fn update<R>(&self, id: &str, patch: impl FnOnce(&mut TaskEntry) -> R) -> Option<R> {
        let (result, changed) = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let entry = entries.iter_mut().find(|e| e.id() == id)?;
            let before = entry.snapshot();
            let result = patch(entry);
            (result, entry.snapshot() != before)
        };
        if changed {
            self.publish(StoreEvent::Updated(id.to_string()));
        }
        Some(result)
    }

    /// Inspect the task with `id` without modifying it
    pub fn read<R>(&self, id: &str, inspect: impl FnOnce(&TaskEntry) -> R) -> Option<R> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().find(|e| e.id() == id).map(inspect)
    }

    /// Remove a task; absent ids are ignored
    pub fn remove(&self, id: &str) -> Option<TaskEntry> {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let index = entries.iter().position(|e| e.id() == id)?;
            entries.remove(index)
        };
        self.publish(StoreEvent::Removed(id.to_string()));
        Some(removed)
    }

    /// Remove every task, handing them back to the caller
    pub fn clear(&self) -> Vec<TaskEntry> {
        let drained = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *entries)
        };
        self.publish(StoreEvent::Cleared);
        drained
    }

    pub fn get(&self, id: &str) -> Option<TransferTask> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|e| e.id() == id)
            .map(TaskEntry::snapshot)
    }

    /// Snapshot of all tasks
    pub fn list(&self) -> Vec<TransferTask> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(TaskEntry::snapshot)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tasks currently downloading
    pub fn active_count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.status() == TransferStatus::Downloading)
            .count()
    }
}

impl Default for TransferStore {
    fn default() -> Self {
        Self::new()
    }
}

// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Transfer task model

use crate::progress;
use crate::types::FileEntry;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Downloading,
    Paused,
    Completed,
    Error,
    Canceled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Canceled => "canceled",
        }
    }
}

/// What a task downloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TransferKind {
    Single { remote_path: String },
    Batch { paths: Vec<String> },
}

/// One user-visible download and its progress.
///
/// Instances handed out by the store are snapshots; the live record stays
/// inside the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTask {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: TransferKind,
    /// Expected total bytes, 0 while unknown
    pub size: u64,
    /// Percent complete, 0..=100
    pub progress: u8,
    pub status: TransferStatus,
    /// Start of the current attempt
    #[serde(skip)]
    pub start_time: Instant,
    /// Bytes received across every attempt; the resume offset
    pub bytes_transferred: u64,
    /// Bytes per second over the current attempt
    pub speed: u64,
    /// Failure text or notice shown against this task
    pub detail: Option<String>,
    /// Where the finished download was saved
    pub saved_to: Option<PathBuf>,
    /// Whether a network request is currently in flight
    pub active_request: bool,
}

impl TransferTask {
    fn new(name: String, kind: TransferKind, size: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            kind,
            size,
            progress: 0,
            status: TransferStatus::Downloading,
            start_time: Instant::now(),
            bytes_transferred: 0,
            speed: 0,
            detail: None,
            saved_to: None,
            active_request: false,
        }
    }

    pub fn single(file: &FileEntry) -> Self {
        Self::new(
            file.name.clone(),
            TransferKind::Single {
                remote_path: file.path.clone(),
            },
            file.size,
        )
    }

    pub fn batch(paths: Vec<String>) -> Self {
        Self::new(format!("{} items", paths.len()), TransferKind::Batch { paths }, 0)
    }

    pub fn is_batch(&self) -> bool {
        matches!(self.kind, TransferKind::Batch { .. })
    }

    /// Remaining time for an active transfer, or the placeholder
    pub fn eta(&self) -> String {
        if self.status != TransferStatus::Downloading {
            return progress::ETA_PLACEHOLDER.to_string();
        }
        progress::format_eta(self.size, self.bytes_transferred, self.speed)
    }
}

/// Exclusive handle to one in-flight request.
///
/// Revoking consumes the handle, so a request can be canceled at most once
/// through it.
#[derive(Debug)]
pub struct TransferHandle {
    token: CancellationToken,
    attempt: u64,
}

impl TransferHandle {
    pub(crate) fn new(token: CancellationToken, attempt: u64) -> Self {
        Self { token, attempt }
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Abort the request this handle controls
    pub fn revoke(self) {
        self.token.cancel();
    }
}

/// A task as held by the store, together with its request handle.
///
/// Status changes go through the methods here so that the handle exists
/// exactly while the task is downloading.
#[derive(Debug)]
pub struct TaskEntry {
    task: TransferTask,
    handle: Option<TransferHandle>,
    attempt: u64,
}

impl TaskEntry {
    pub fn new(task: TransferTask) -> Self {
        Self {
            task,
            handle: None,
            attempt: 0,
        }
    }

    pub fn task(&self) -> &TransferTask {
        &self.task
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn status(&self) -> TransferStatus {
        self.task.status
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn snapshot(&self) -> TransferTask {
        TransferTask {
            active_request: self.handle.is_some(),
            ..self.task.clone()
        }
    }

    /// True while `attempt` is the request this task is waiting on
    pub fn is_current(&self, attempt: u64) -> bool {
        self.handle.as_ref().map(|h| h.attempt()) == Some(attempt)
    }

    /// Start a new request attempt, revoking any earlier one first.
    /// Returns the attempt number the new request must report under.
    pub fn begin_attempt(&mut self, token: CancellationToken) -> u64 {
        self.revoke_handle();
        self.attempt += 1;
        self.handle = Some(TransferHandle::new(token, self.attempt));
        self.task.status = TransferStatus::Downloading;
        self.task.start_time = Instant::now();
        self.task.speed = 0;
        self.task.detail = None;
        self.attempt
    }

    /// Revoke the in-flight request, if any
    pub fn revoke_handle(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.revoke();
                true
            }
            None => false,
        }
    }

    /// Record progress for `attempt`. `loaded` is the cumulative byte count,
    /// `attempt_bytes` what this attempt alone has received.
    /// Returns false when the attempt is no longer current.
    pub fn record_progress(&mut self, attempt: u64, loaded: u64, attempt_bytes: u64) -> bool {
        if !self.is_current(attempt) {
            return false;
        }

        let task = &mut self.task;
        if task.size > 0 && loaded > task.size {
            // The remote file grew; the listing size was stale.
            task.size = loaded;
        }
        task.bytes_transferred = loaded;
        if let Some(pct) = progress::percent(loaded, task.size) {
            task.progress = pct;
        }
        task.speed = progress::speed(attempt_bytes, task.start_time.elapsed());
        true
    }

    /// Adopt a total size reported by the server when none was known
    pub fn learn_size(&mut self, size: u64) {
        if self.task.size == 0 && size > 0 {
            self.task.size = size;
        }
    }

    pub fn pause(&mut self) {
        self.revoke_handle();
        self.task.status = TransferStatus::Paused;
        self.task.speed = 0;
    }

    pub fn complete(&mut self) {
        self.handle = None;
        let task = &mut self.task;
        if task.size == 0 {
            task.size = task.bytes_transferred;
        }
        task.status = TransferStatus::Completed;
        task.progress = 100;
        task.bytes_transferred = task.size;
        task.speed = 0;
    }

    pub fn fail(&mut self, detail: impl Into<String>) {
        self.handle = None;
        self.task.status = TransferStatus::Error;
        self.task.speed = 0;
        self.task.detail = Some(detail.into());
    }

    pub fn mark_canceled(&mut self) {
        self.handle = None;
        self.task.status = TransferStatus::Canceled;
        self.task.speed = 0;
    }

    pub fn set_detail(&mut self, detail: Option<String>) {
        self.task.detail = detail;
    }

    pub fn set_saved_to(&mut self, path: PathBuf) {
        self.task.saved_to = Some(path);
    }
}

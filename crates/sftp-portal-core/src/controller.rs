// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Transfer lifecycle controller
//
// Drives tasks through downloading -> paused/completed/error/canceled.
// Every request runs under an attempt number; progress and results from an
// attempt that is no longer current are dropped, so a paused or restarted
// task is never written by a stale byte stream.

use crate::browser::DirectoryView;
use crate::remote::{ChunkStream, RemoteError, RemoteService};
use crate::save::DownloadDir;
use crate::store::{StoreEvent, TransferStore};
use crate::task::{TaskEntry, TransferStatus, TransferTask};
use crate::types::{AppError, FileEntry};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Why a transfer attempt ended without completing
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("{name} is no longer listed in the current directory")]
    StalePath { name: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl TransferError {
    fn is_canceled(&self) -> bool {
        matches!(self, TransferError::Remote(e) if e.is_canceled())
    }
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        TransferError::App(err.into())
    }
}

pub(crate) struct Inner {
    pub(crate) remote: Arc<dyn RemoteService>,
    pub(crate) view: Arc<DirectoryView>,
    pub(crate) store: TransferStore,
    pub(crate) downloads: DownloadDir,
    /// Parent of every request token; fired on shutdown
    pub(crate) root: CancellationToken,
}

/// Owns the transfer tasks and the requests behind them.
///
/// None of the operations return errors: failures show up as task status
/// and detail. Calls whose preconditions do not hold are no-ops.
#[derive(Clone)]
pub struct TransferController {
    pub(crate) inner: Arc<Inner>,
}

impl TransferController {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        view: Arc<DirectoryView>,
        downloads: DownloadDir,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                view,
                store: TransferStore::new(),
                downloads,
                root: CancellationToken::new(),
            }),
        }
    }

    /// Snapshot of every task, most recent first
    pub fn tasks(&self) -> Vec<TransferTask> {
        self.inner.store.list()
    }

    pub fn task(&self, id: &str) -> Option<TransferTask> {
        self.inner.store.get(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.store.subscribe()
    }

    pub fn active_count(&self) -> usize {
        self.inner.store.active_count()
    }

    pub fn downloads(&self) -> &DownloadDir {
        &self.inner.downloads
    }

    pub fn view(&self) -> &Arc<DirectoryView> {
        &self.inner.view
    }

    /// Begin downloading a listed file. Returns the new task's id.
    pub fn start(&self, file: &FileEntry) -> Option<String> {
        if file.is_directory {
            tracing::debug!("Ignoring download request for directory {}", file.path);
            return None;
        }

        let token = self.inner.root.child_token();
        let mut entry = TaskEntry::new(TransferTask::single(file));
        let attempt = entry.begin_attempt(token.clone());
        let id = self.inner.store.insert(entry);
        tracing::info!("Downloading {} ({} bytes) as task {}", file.path, file.size, id);

        self.spawn_single(id.clone(), attempt, file.name.clone(), file.path.clone(), 0, token);
        Some(id)
    }

    /// Stop a single-file download, keeping what was received
    pub fn pause(&self, id: &str) {
        let paused = self.inner.store.update(id, |entry| {
            if entry.status() != TransferStatus::Downloading || entry.task().is_batch() {
                return None;
            }
            entry.pause();
            Some(entry.task().bytes_transferred)
        });

        if let Some(Some(offset)) = paused {
            tracing::info!("Paused task {} at {} bytes", id, offset);
        }
    }

    /// Continue a paused download from its resume offset.
    ///
    /// The file is looked up by name in the current listing. If it is not
    /// there the task stays paused and a notice is put in its detail.
    pub fn resume(&self, id: &str) {
        let Some(task) = self.inner.store.get(id) else {
            return;
        };
        if task.status != TransferStatus::Paused || task.is_batch() {
            return;
        }

        let Some(file) = self
            .inner
            .view
            .find_by_name(&task.name)
            .filter(|f| !f.is_directory)
        else {
            let err = TransferError::StalePath {
                name: task.name.clone(),
            };
            tracing::warn!(
                "Cannot resume task {}: {} (viewing {})",
                id,
                err,
                self.inner.view.current_path()
            );
            self.inner
                .store
                .update(id, |entry| entry.set_detail(Some(err.to_string())));
            return;
        };

        let token = self.inner.root.child_token();
        let begun = self
            .inner
            .store
            .update(id, |entry| {
                if entry.status() != TransferStatus::Paused {
                    return None;
                }
                entry.learn_size(file.size);
                let attempt = entry.begin_attempt(token.clone());
                Some((attempt, entry.task().bytes_transferred))
            })
            .flatten();

        let Some((attempt, offset)) = begun else {
            return;
        };
        tracing::info!("Resuming task {} ({}) from byte {}", id, file.path, offset);
        self.spawn_single(id.to_string(), attempt, task.name, file.path, offset, token);
    }

    /// Abort a task and drop it from the list
    pub fn cancel(&self, id: &str) {
        let Some(mut entry) = self.inner.store.remove(id) else {
            return;
        };
        self.release(&mut entry);
        tracing::info!("Canceled task {}", id);
    }

    /// Abort everything and empty the list
    pub fn dismiss_all(&self) {
        let mut entries = self.inner.store.clear();
        for entry in &mut entries {
            self.release(entry);
        }
        tracing::info!("Dismissed {} transfers", entries.len());
    }

    /// Cancel every in-flight request for good, e.g. on logout. Affected
    /// tasks end up `canceled`.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down {} active transfers", self.active_count());
        self.inner.root.cancel();
    }

    /// Revoke a removed entry's request and clean up its partial file.
    /// An in-flight worker cleans up after itself once it sees the entry gone.
    fn release(&self, entry: &mut TaskEntry) {
        let was_active = entry.revoke_handle();
        if !was_active && entry.status() == TransferStatus::Paused {
            let partial = self
                .inner
                .downloads
                .partial_path(entry.id(), &entry.task().name);
            self.inner.downloads.discard(&partial);
        }
    }

    fn spawn_single(
        &self,
        id: String,
        attempt: u64,
        name: String,
        remote_path: String,
        offset: u64,
        token: CancellationToken,
    ) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let partial = inner.downloads.partial_path(&id, &name);
            let result = inner
                .receive_file(&id, attempt, &remote_path, &partial, offset, &token)
                .await;
            inner.settle(&id, attempt, &name, &partial, result).await;
        });
    }
}

impl Inner {
    async fn receive_file(
        &self,
        id: &str,
        attempt: u64,
        remote_path: &str,
        partial: &Path,
        offset: u64,
        token: &CancellationToken,
    ) -> Result<(), TransferError> {
        let range_start = (offset > 0).then_some(offset);
        let download = self
            .remote
            .download_file(self.view.session(), remote_path, range_start, token)
            .await?;

        if let Some(length) = download.content_length {
            self.store
                .update(id, |entry| entry.learn_size(offset + length));
        }

        // A superseded attempt must not truncate the file its successor owns
        if !self.is_current(id, attempt) {
            return Err(RemoteError::Canceled.into());
        }
        let mut file = self.downloads.open_partial(partial, offset).await?;
        self.pump(id, attempt, download.chunks, &mut file, offset)
            .await?;
        Ok(())
    }

    fn is_current(&self, id: &str, attempt: u64) -> bool {
        self.store
            .read(id, |entry| entry.is_current(attempt))
            .unwrap_or(false)
    }

    /// Copy chunks into `sink`, recording progress after each one.
    /// Stops with `Canceled` once `attempt` is no longer current.
    pub(crate) async fn pump<W>(
        &self,
        id: &str,
        attempt: u64,
        mut chunks: ChunkStream,
        sink: &mut W,
        offset: u64,
    ) -> Result<u64, TransferError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut received: u64 = 0;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            sink.flush().await?;
            received += chunk.len() as u64;

            let current = self
                .store
                .update(id, |entry| {
                    entry.record_progress(attempt, offset + received, received)
                })
                .unwrap_or(false);
            if !current {
                return Err(RemoteError::Canceled.into());
            }
        }
        Ok(received)
    }

    /// Apply the outcome of an attempt to its task. Returns true when the
    /// task completed and its file was saved.
    pub(crate) async fn settle(
        &self,
        id: &str,
        attempt: u64,
        name: &str,
        partial: &Path,
        result: Result<(), TransferError>,
    ) -> bool {
        match result {
            Ok(()) => {
                let completed = self.store.update(id, |entry| {
                    if !entry.is_current(attempt) {
                        return false;
                    }
                    entry.complete();
                    true
                });
                match completed {
                    Some(true) => {}
                    // Paused or restarted right at the end; the next attempt owns the file
                    Some(false) => return false,
                    None => {
                        self.downloads.discard(partial);
                        return false;
                    }
                }

                match self.downloads.finalize(partial, name).await {
                    Ok(path) => {
                        tracing::info!("Task {} completed: {:?}", id, path);
                        self.store.update(id, |entry| entry.set_saved_to(path));
                        true
                    }
                    Err(e) => {
                        tracing::error!("Failed to save {}: {}", name, e);
                        self.store.update(id, |entry| entry.fail(e.to_string()));
                        self.downloads.discard(partial);
                        false
                    }
                }
            }
            Err(err) if err.is_canceled() => {
                let canceled = self.store.update(id, |entry| {
                    if !entry.is_current(attempt) {
                        return false;
                    }
                    entry.mark_canceled();
                    true
                });
                match canceled {
                    // Paused: keep the partial file as the resume base
                    Some(false) => {}
                    Some(true) => {
                        tracing::info!("Task {} canceled", id);
                        self.downloads.discard(partial);
                    }
                    None => self.downloads.discard(partial),
                }
                false
            }
            Err(err) => {
                let detail = err.to_string();
                let failed = self.store.update(id, |entry| {
                    if !entry.is_current(attempt) {
                        return false;
                    }
                    entry.fail(detail.clone());
                    true
                });
                if failed != Some(false) {
                    tracing::error!("Task {} ({}) failed: {}", id, name, detail);
                    self.downloads.discard(partial);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dir_entry, file_entry, session, settle, wait_until, Call, ScriptedRemote};
    use std::time::{Duration, Instant};

    const OCTET: &str = "application/octet-stream";

    struct Fixture {
        remote: Arc<ScriptedRemote>,
        view: Arc<DirectoryView>,
        controller: TransferController,
        dir: tempfile::TempDir,
    }

    async fn fixture(entries: Vec<FileEntry>) -> Fixture {
        let remote = Arc::new(ScriptedRemote::new());
        remote.set_listing("/data", entries);
        remote.set_listing("/elsewhere", vec![]);

        let view = Arc::new(DirectoryView::new(remote.clone(), session(), 1024));
        view.navigate("/data").await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let controller = TransferController::new(
            remote.clone(),
            view.clone(),
            DownloadDir::new(dir.path()),
        );
        Fixture {
            remote,
            view,
            controller,
            dir,
        }
    }

    fn status(controller: &TransferController, id: &str) -> Option<TransferStatus> {
        controller.task(id).map(|t| t.status)
    }

    #[tokio::test]
    async fn test_pause_and_resume_across_two_chunks() {
        let big = file_entry("/data", "big.bin", 1_000_000);
        let fx = fixture(vec![big.clone()]).await;

        let first = fx.remote.feed(&big.path, OCTET, Some(1_000_000));
        let id = fx.controller.start(&big).unwrap();
        first.send(vec![1u8; 600_000]);
        wait_until(|| fx.controller.task(&id).unwrap().bytes_transferred == 600_000).await;

        fx.controller.pause(&id);
        let task = fx.controller.task(&id).unwrap();
        assert_eq!(task.status, TransferStatus::Paused);
        assert_eq!(task.bytes_transferred, 600_000);
        assert_eq!(task.progress, 60);
        assert_eq!(task.speed, 0);
        assert!(!task.active_request);

        let second = fx.remote.feed(&big.path, OCTET, Some(400_000));
        fx.controller.resume(&id);
        assert!(fx.controller.task(&id).unwrap().active_request);
        wait_until(|| fx.remote.calls().len() == 2).await;
        assert_eq!(
            fx.remote.calls()[1],
            Call::File {
                path: "/data/big.bin".to_string(),
                range_start: Some(600_000),
            }
        );

        second.send(vec![2u8; 400_000]);
        second.finish();
        wait_until(|| status(&fx.controller, &id) == Some(TransferStatus::Completed)).await;

        let task = fx.controller.task(&id).unwrap();
        assert_eq!(task.bytes_transferred, 1_000_000);
        assert_eq!(task.progress, 100);
        assert!(!task.active_request);

        let saved = task.saved_to.unwrap();
        assert_eq!(saved, fx.dir.path().join("big.bin"));
        let bytes = tokio::fs::read(&saved).await.unwrap();
        assert_eq!(bytes.len(), 1_000_000);
        assert!(bytes[..600_000].iter().all(|b| *b == 1));
        assert!(bytes[600_000..].iter().all(|b| *b == 2));
    }

    #[tokio::test]
    async fn test_resumed_speed_counts_only_new_bytes() {
        let big = file_entry("/data", "big.bin", 1_000_000);
        let fx = fixture(vec![big.clone()]).await;

        let first = fx.remote.feed(&big.path, OCTET, Some(1_000_000));
        let id = fx.controller.start(&big).unwrap();
        first.send(vec![0u8; 600_000]);
        wait_until(|| fx.controller.task(&id).unwrap().bytes_transferred == 600_000).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        fx.controller.pause(&id);

        let second = fx.remote.feed(&big.path, OCTET, Some(400_000));
        let resumed_at = Instant::now();
        fx.controller.resume(&id);
        tokio::time::sleep(Duration::from_millis(100)).await;
        second.send(vec![0u8; 1_000]);
        wait_until(|| fx.controller.task(&id).unwrap().bytes_transferred == 601_000).await;
        let elapsed = resumed_at.elapsed().as_secs_f64();

        // 1,000 bytes over at least 100ms of the resumed attempt
        let speed = fx.controller.task(&id).unwrap().speed;
        assert!(speed <= 10_000, "speed {} includes earlier bytes", speed);
        assert!(
            speed >= (1_000.0 / elapsed).floor() as u64,
            "speed {} measured from before the resume",
            speed
        );
    }

    #[tokio::test]
    async fn test_superseded_attempt_keeps_partial_file() {
        let file = file_entry("/data", "a.bam", 10);
        let fx = fixture(vec![file.clone()]).await;
        let inner = &fx.controller.inner;

        let mut entry = TaskEntry::new(TransferTask::single(&file));
        let stale = entry.begin_attempt(CancellationToken::new());
        entry.begin_attempt(CancellationToken::new());
        let id = inner.store.insert(entry);

        let partial = inner.downloads.partial_path(&id, &file.name);
        tokio::fs::write(&partial, b"kept").await.unwrap();

        let _feed = fx.remote.feed(&file.path, OCTET, Some(10));
        let result = inner
            .receive_file(&id, stale, &file.path, &partial, 0, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ref e) if e.is_canceled()));
        assert_eq!(tokio::fs::read(&partial).await.unwrap(), b"kept");
    }

    #[tokio::test]
    async fn test_progress_stays_within_size() {
        let file = file_entry("/data", "reads.fastq", 300);
        let fx = fixture(vec![file.clone()]).await;

        let feed = fx.remote.feed(&file.path, OCTET, Some(300));
        let id = fx.controller.start(&file).unwrap();
        for expected in [100u64, 200, 300] {
            feed.send(vec![0u8; 100]);
            wait_until(|| fx.controller.task(&id).unwrap().bytes_transferred == expected).await;
            let task = fx.controller.task(&id).unwrap();
            assert!(task.bytes_transferred <= task.size);
            assert_eq!(Some(task.progress), crate::progress::percent(expected, 300));
        }
        feed.finish();
        wait_until(|| status(&fx.controller, &id) == Some(TransferStatus::Completed)).await;
    }

    #[tokio::test]
    async fn test_cancel_removes_and_pause_keeps() {
        let a = file_entry("/data", "a.vcf", 10);
        let b = file_entry("/data", "b.vcf", 10);
        let fx = fixture(vec![a.clone(), b.clone()]).await;

        let feed_a = fx.remote.feed(&a.path, OCTET, Some(10));
        let feed_b = fx.remote.feed(&b.path, OCTET, Some(10));
        let id_a = fx.controller.start(&a).unwrap();
        let id_b = fx.controller.start(&b).unwrap();
        feed_a.send(vec![0u8; 4]);
        feed_b.send(vec![0u8; 4]);
        wait_until(|| fx.controller.task(&id_b).unwrap().bytes_transferred == 4).await;

        fx.controller.pause(&id_a);
        fx.controller.cancel(&id_b);
        settle().await;

        assert_eq!(status(&fx.controller, &id_a), Some(TransferStatus::Paused));
        assert!(fx.controller.task(&id_b).is_none());
        assert_eq!(fx.controller.tasks().len(), 1);

        // a second cancel is harmless
        fx.controller.cancel(&id_b);
        let partial_b = fx.controller.inner.downloads.partial_path(&id_b, "b.vcf");
        assert!(!partial_b.exists());
    }

    #[tokio::test]
    async fn test_handle_present_only_while_downloading() {
        let file = file_entry("/data", "a.bed", 10);
        let fx = fixture(vec![file.clone()]).await;

        let _first = fx.remote.feed(&file.path, OCTET, Some(10));
        let id = fx.controller.start(&file).unwrap();
        let task = fx.controller.task(&id).unwrap();
        assert_eq!(task.status, TransferStatus::Downloading);
        assert!(task.active_request);

        fx.controller.pause(&id);
        let task = fx.controller.task(&id).unwrap();
        assert_eq!(task.status, TransferStatus::Paused);
        assert!(!task.active_request);

        let _second = fx.remote.feed(&file.path, OCTET, Some(10));
        fx.controller.resume(&id);
        let task = fx.controller.task(&id).unwrap();
        assert_eq!(task.status, TransferStatus::Downloading);
        assert!(task.active_request);

        fx.controller.cancel(&id);
        assert!(fx.controller.task(&id).is_none());
    }

    #[tokio::test]
    async fn test_stale_pause_does_not_become_canceled() {
        let file = file_entry("/data", "a.bed", 10);
        let fx = fixture(vec![file.clone()]).await;

        let feed = fx.remote.feed(&file.path, OCTET, Some(10));
        let id = fx.controller.start(&file).unwrap();
        feed.send(vec![0u8; 3]);
        wait_until(|| fx.controller.task(&id).unwrap().bytes_transferred == 3).await;

        fx.controller.pause(&id);
        // chunks arriving after the pause are dropped
        feed.send(vec![0u8; 3]);
        settle().await;

        let task = fx.controller.task(&id).unwrap();
        assert_eq!(task.status, TransferStatus::Paused);
        assert_eq!(task.bytes_transferred, 3);
    }

    #[tokio::test]
    async fn test_resume_after_navigation_stays_paused() {
        let file = file_entry("/data", "a.bam", 10);
        let fx = fixture(vec![file.clone()]).await;

        let feed = fx.remote.feed(&file.path, OCTET, Some(10));
        let id = fx.controller.start(&file).unwrap();
        feed.send(vec![0u8; 5]);
        wait_until(|| fx.controller.task(&id).unwrap().bytes_transferred == 5).await;
        fx.controller.pause(&id);

        fx.view.navigate("/elsewhere").await.unwrap();
        fx.controller.resume(&id);
        settle().await;

        let task = fx.controller.task(&id).unwrap();
        assert_eq!(task.status, TransferStatus::Paused);
        assert_eq!(task.bytes_transferred, 5);
        assert!(task.detail.unwrap().contains("a.bam"));
        assert_eq!(fx.remote.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_marks_error() {
        let file = file_entry("/data", "a.bam", 10);
        let fx = fixture(vec![file.clone()]).await;

        let feed = fx.remote.feed(&file.path, OCTET, Some(10));
        let id = fx.controller.start(&file).unwrap();
        feed.fail(RemoteError::Network("connection reset".to_string()));
        wait_until(|| status(&fx.controller, &id) == Some(TransferStatus::Error)).await;

        let task = fx.controller.task(&id).unwrap();
        assert!(!task.active_request);
        assert!(task.detail.unwrap().contains("connection reset"));
        // no automatic retry
        settle().await;
        assert_eq!(fx.remote.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_one_failure_leaves_others_alone() {
        let a = file_entry("/data", "a.bam", 4);
        let b = file_entry("/data", "b.bam", 4);
        let fx = fixture(vec![a.clone(), b.clone()]).await;

        let feed_a = fx.remote.feed(&a.path, OCTET, Some(4));
        let feed_b = fx.remote.feed(&b.path, OCTET, Some(4));
        let id_a = fx.controller.start(&a).unwrap();
        let id_b = fx.controller.start(&b).unwrap();

        feed_a.fail(RemoteError::Network("reset".to_string()));
        feed_b.send(vec![0u8; 4]);
        feed_b.finish();

        wait_until(|| status(&fx.controller, &id_b) == Some(TransferStatus::Completed)).await;
        wait_until(|| status(&fx.controller, &id_a) == Some(TransferStatus::Error)).await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight() {
        let file = file_entry("/data", "a.bam", 10);
        let fx = fixture(vec![file.clone()]).await;

        let _feed = fx.remote.feed(&file.path, OCTET, Some(10));
        let id = fx.controller.start(&file).unwrap();
        fx.controller.shutdown();

        wait_until(|| status(&fx.controller, &id) == Some(TransferStatus::Canceled)).await;
        assert!(!fx.controller.task(&id).unwrap().active_request);
    }

    #[tokio::test]
    async fn test_noops() {
        let file = file_entry("/data", "a.bam", 10);
        let fx = fixture(vec![file.clone(), dir_entry("/data", "runs")]).await;

        assert!(fx.controller.start(&dir_entry("/data", "runs")).is_none());
        fx.controller.pause("missing");
        fx.controller.resume("missing");
        fx.controller.cancel("missing");

        let feed = fx.remote.feed(&file.path, OCTET, Some(10));
        let id = fx.controller.start(&file).unwrap();
        // resume while downloading does nothing
        fx.controller.resume(&id);
        feed.send(vec![0u8; 10]);
        feed.finish();
        wait_until(|| status(&fx.controller, &id) == Some(TransferStatus::Completed)).await;

        // pause after completion does nothing
        fx.controller.pause(&id);
        assert_eq!(status(&fx.controller, &id), Some(TransferStatus::Completed));
        assert_eq!(fx.remote.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_size_learned_from_response() {
        let file = file_entry("/data", "a.bam", 0);
        let fx = fixture(vec![file.clone()]).await;

        let feed = fx.remote.feed(&file.path, OCTET, Some(8));
        let id = fx.controller.start(&file).unwrap();
        feed.send(vec![0u8; 4]);
        wait_until(|| fx.controller.task(&id).unwrap().bytes_transferred == 4).await;

        let task = fx.controller.task(&id).unwrap();
        assert_eq!(task.size, 8);
        assert_eq!(task.progress, 50);
    }

    #[tokio::test]
    async fn test_dismiss_all_empties_store() {
        let a = file_entry("/data", "a.bam", 10);
        let fx = fixture(vec![a.clone()]).await;

        let feed = fx.remote.feed(&a.path, OCTET, Some(10));
        fx.controller.start(&a).unwrap();
        fx.controller.dismiss_all();
        feed.send(vec![0u8; 10]);
        settle().await;

        assert!(fx.controller.tasks().is_empty());
        assert!(!fx.dir.path().join("a.bam").exists());
    }
}

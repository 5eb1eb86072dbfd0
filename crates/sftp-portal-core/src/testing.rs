// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Scripted remote service for unit tests

use crate::remote::{cancellable, Download, RemoteError, RemoteService};
use crate::types::{Credentials, FileEntry, Session};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) fn session() -> Session {
    Session {
        session_id: "s-1".to_string(),
        server: "files.example.org".to_string(),
        username: "lab".to_string(),
        current_path: "/".to_string(),
    }
}

pub(crate) fn file_entry(dir: &str, name: &str, size: u64) -> FileEntry {
    FileEntry {
        name: name.to_string(),
        size,
        is_directory: false,
        path: format!("{}/{}", dir.trim_end_matches('/'), name),
        modify_time: 0,
        kind: "-".to_string(),
    }
}

pub(crate) fn dir_entry(dir: &str, name: &str) -> FileEntry {
    FileEntry {
        is_directory: true,
        kind: "d".to_string(),
        ..file_entry(dir, name, 0)
    }
}

/// Feed key for batch archive requests
pub(crate) const BATCH: &str = "<batch>";

/// A download request the scripted remote received
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    File {
        path: String,
        range_start: Option<u64>,
    },
    Batch {
        paths: Vec<String>,
    },
}

struct Feed {
    content_type: Option<String>,
    content_length: Option<u64>,
    rx: mpsc::UnboundedReceiver<Result<Bytes, RemoteError>>,
}

/// Test side of a queued response body
pub(crate) struct FeedHandle {
    tx: mpsc::UnboundedSender<Result<Bytes, RemoteError>>,
}

impl FeedHandle {
    pub(crate) fn send(&self, data: impl Into<Bytes>) {
        let _ = self.tx.send(Ok(data.into()));
    }

    pub(crate) fn fail(&self, err: RemoteError) {
        let _ = self.tx.send(Err(err));
    }

    /// End the body
    pub(crate) fn finish(self) {}
}

/// In-memory [`RemoteService`]. Download responses are queued with
/// [`ScriptedRemote::feed`] and consumed in order; their bodies are pushed
/// by the test through the returned handle.
#[derive(Default)]
pub(crate) struct ScriptedRemote {
    listings: Mutex<HashMap<String, Vec<FileEntry>>>,
    previews: Mutex<HashMap<String, String>>,
    feeds: Mutex<HashMap<String, VecDeque<Feed>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRemote {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_listing(&self, path: &str, entries: Vec<FileEntry>) {
        self.listings
            .lock()
            .unwrap()
            .insert(path.to_string(), entries);
    }

    pub(crate) fn set_preview(&self, path: &str, text: &str) {
        self.previews
            .lock()
            .unwrap()
            .insert(path.to_string(), text.to_string());
    }

    /// Queue the next download response for `key`: a remote path, or
    /// [`BATCH`] for archive requests
    pub(crate) fn feed(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
    ) -> FeedHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(Feed {
                content_type: Some(content_type.to_string()),
                content_length,
                rx,
            });
        FeedHandle { tx }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next_download(
        &self,
        key: &str,
        call: Call,
        cancel: &CancellationToken,
    ) -> Result<Download, RemoteError> {
        self.calls.lock().unwrap().push(call);
        let feed = self
            .feeds
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| RemoteError::Network("no scripted response".to_string()))?;

        let chunks = stream::unfold(feed.rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();

        Ok(Download {
            content_type: feed.content_type,
            content_length: feed.content_length,
            chunks: cancellable(chunks, cancel.clone()),
        })
    }
}

#[async_trait]
impl RemoteService for ScriptedRemote {
    async fn connect(&self, credentials: &Credentials) -> Result<Session, RemoteError> {
        Ok(Session {
            server: credentials.normalized_server(),
            username: credentials.username.clone(),
            current_path: credentials.path.clone(),
            ..session()
        })
    }

    async fn list_directory(
        &self,
        _session: &Session,
        path: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<FileEntry>, RemoteError> {
        self.listings
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                code: 404,
                message: format!("No such directory: {}", path),
            })
    }

    async fn download_file(
        &self,
        _session: &Session,
        path: &str,
        range_start: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<Download, RemoteError> {
        self.next_download(
            path,
            Call::File {
                path: path.to_string(),
                range_start,
            },
            cancel,
        )
    }

    async fn download_batch(
        &self,
        _session: &Session,
        paths: &[String],
        cancel: &CancellationToken,
    ) -> Result<Download, RemoteError> {
        self.next_download(
            BATCH,
            Call::Batch {
                paths: paths.to_vec(),
            },
            cancel,
        )
    }

    async fn preview_file(
        &self,
        _session: &Session,
        path: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, RemoteError> {
        self.previews
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                code: 404,
                message: "not found".to_string(),
            })
    }

    async fn delete(
        &self,
        _session: &Session,
        _path: &str,
        _is_directory: bool,
    ) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn upload(
        &self,
        _session: &Session,
        _remote_dir: &str,
        _local_file: &Path,
    ) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn disconnect(&self, _session: &Session) -> Result<(), RemoteError> {
        Ok(())
    }
}

/// Poll `condition` until it holds, failing the test after two seconds
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Let spawned tasks run for a moment
pub(crate) fn settle() -> impl Future<Output = ()> {
    tokio::time::sleep(Duration::from_millis(50))
}

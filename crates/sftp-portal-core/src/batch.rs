// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Batch downloads
//
// The server zips the selected files into one archive. When it fails it
// answers with a JSON or HTML body instead, which is only recognizable by
// the content type.

use crate::controller::{Inner, TransferController, TransferError};
use crate::remote::{error_message_from_body, RemoteError};
use crate::task::{TaskEntry, TransferTask};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// File name every batch archive is saved under
pub const ARCHIVE_NAME: &str = "files.zip";

impl TransferController {
    /// Download every selected file as one archive. Returns the new task's
    /// id, or `None` when nothing is selected.
    ///
    /// Batch tasks cannot be paused or resumed.
    pub fn start_batch(&self) -> Option<String> {
        let paths = self.inner.view.selection().paths().to_vec();
        if paths.is_empty() {
            tracing::debug!("Batch download requested with nothing selected");
            return None;
        }

        let token = self.inner.root.child_token();
        let mut entry = TaskEntry::new(TransferTask::batch(paths.clone()));
        let attempt = entry.begin_attempt(token.clone());
        let id = self.inner.store.insert(entry);
        tracing::info!("Downloading {} files as archive, task {}", paths.len(), id);

        let inner = self.inner.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            let partial = inner.downloads.partial_path(&task_id, ARCHIVE_NAME);
            let result = inner
                .receive_batch(&task_id, attempt, &paths, &partial, &token)
                .await;
            if inner
                .settle(&task_id, attempt, ARCHIVE_NAME, &partial, result)
                .await
            {
                inner.view.selection().clear();
            }
        });
        Some(id)
    }
}

impl Inner {
    async fn receive_batch(
        &self,
        id: &str,
        attempt: u64,
        paths: &[String],
        partial: &Path,
        token: &CancellationToken,
    ) -> Result<(), TransferError> {
        let download = self
            .remote
            .download_batch(self.view.session(), paths, token)
            .await?;

        if let Some(length) = download.content_length {
            self.store.update(id, |entry| entry.learn_size(length));
        }

        if is_error_payload(download.content_type.as_deref()) {
            let mut body = Vec::new();
            self.pump(id, attempt, download.chunks, &mut body, 0).await?;
            let detail = server_error_detail(&String::from_utf8_lossy(&body));
            tracing::warn!("Server refused batch download: {}", detail);
            return Err(RemoteError::ServerReported(detail).into());
        }

        let mut file = self.downloads.open_partial(partial, 0).await?;
        self.pump(id, attempt, download.chunks, &mut file, 0).await?;
        Ok(())
    }
}

/// Whether a declared content type means the body is an error page
/// rather than an archive
fn is_error_payload(content_type: Option<&str>) -> bool {
    content_type
        .map(str::to_ascii_lowercase)
        .is_some_and(|ct| ct.contains("application/json") || ct.contains("text/html"))
}

fn server_error_detail(body: &str) -> String {
    if let Some(message) = error_message_from_body(body) {
        return message;
    }
    let text = body.trim();
    if text.is_empty() {
        "Server error".to_string()
    } else {
        text.to_string()
    }
}

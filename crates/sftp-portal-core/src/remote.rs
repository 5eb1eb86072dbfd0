// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Remote service client
//
// Thin request layer over the SFTP proxy's HTTP API. Downloads hand back
// the response metadata and a chunk stream; every chunk is one progress
// event for whoever consumes it.

use crate::types::{ClientSettings, Credentials, FileEntry, Session};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE, RANGE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Body of a download, delivered chunk by chunk
pub type ChunkStream = BoxStream<'static, Result<Bytes, RemoteError>>;

/// A started download: headers are in, the body is still streaming
pub struct Download {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Failures of remote operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Request canceled")]
    Canceled,

    /// A success status whose body turned out to be an error payload
    #[error("{0}")]
    ServerReported(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("File I/O error: {0}")]
    Io(String),
}

impl RemoteError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RemoteError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, RemoteError::Canceled)
    }

    /// Whether trying again later could help. Nothing in this crate retries
    /// on its own; this only informs the message shown to the user.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Status { code, .. } => *code >= 500 || *code == 408 || *code == 429,
            RemoteError::Network(_) => true,
            _ => false,
        }
    }

    /// User-facing text for this error
    pub fn display_message(&self) -> String {
        match self.status_code() {
            Some(401) | Some(403) => {
                "Authentication failed. Please check your credentials.".to_string()
            }
            Some(404) => "Server or path not found.".to_string(),
            Some(500) => "Server error. Please try again later.".to_string(),
            Some(503) => "Service unavailable. Please try again later.".to_string(),
            Some(408) | Some(429) => "Request timeout. Please try again.".to_string(),
            _ => match self {
                RemoteError::Status { message, .. } => message.clone(),
                other => other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        RemoteError::Io(err.to_string())
    }
}

/// Operations offered by the SFTP proxy.
///
/// Listing and every call that moves file content take a cancellation
/// token. Once the token fires the call, or the chunk stream it returned,
/// fails with [`RemoteError::Canceled`].
#[async_trait]
pub trait RemoteService: Send + Sync + 'static {
    async fn connect(&self, credentials: &Credentials) -> Result<Session, RemoteError>;

    async fn list_directory(
        &self,
        session: &Session,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileEntry>, RemoteError>;

    /// Download one file, starting at `range_start` when resuming
    async fn download_file(
        &self,
        session: &Session,
        path: &str,
        range_start: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<Download, RemoteError>;

    /// Download several files as one archive built by the server
    async fn download_batch(
        &self,
        session: &Session,
        paths: &[String],
        cancel: &CancellationToken,
    ) -> Result<Download, RemoteError>;

    async fn preview_file(
        &self,
        session: &Session,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<String, RemoteError>;

    async fn delete(
        &self,
        session: &Session,
        path: &str,
        is_directory: bool,
    ) -> Result<(), RemoteError>;

    async fn upload(
        &self,
        session: &Session,
        remote_dir: &str,
        local_file: &Path,
    ) -> Result<(), RemoteError>;

    async fn disconnect(&self, session: &Session) -> Result<(), RemoteError>;
}

/// Ends `inner` with [`RemoteError::Canceled`] as soon as `cancel` fires.
/// Chunks still queued behind the cancellation are dropped.
pub fn cancellable(inner: ChunkStream, cancel: CancellationToken) -> ChunkStream {
    stream::unfold(Some((inner, cancel)), |state| async move {
        let (mut inner, cancel) = state?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Some((Err(RemoteError::Canceled), None)),
            next = inner.next() => next.map(|item| (item, Some((inner, cancel)))),
        }
    })
    .boxed()
}

/// Pull the `error` field out of a JSON error body
pub fn error_message_from_body(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body.trim())
        .ok()
        .map(|b| b.error)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectResponse {
    session_id: String,
}

#[derive(Deserialize)]
struct ListResponse {
    files: Vec<FileEntry>,
}

/// [`RemoteService`] over the proxy's HTTP API
pub struct HttpRemote {
    http_client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(settings: &ClientSettings) -> Result<Self, RemoteError> {
        let http_client = Client::builder()
            // No overall timeout: a stalled transfer is left to the user
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| RemoteError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, RemoteError> {
        let response = match cancel {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RemoteError::Canceled),
                response = request.send() => response,
            },
            None => request.send().await,
        }
        .map_err(map_request_error)?;

        check_status(response).await
    }
}

fn map_request_error(e: reqwest::Error) -> RemoteError {
    if let Some(status) = e.status() {
        return RemoteError::Status {
            code: status.as_u16(),
            message: e.to_string(),
        };
    }
    if e.is_connect() {
        RemoteError::Network(format!("Cannot connect to server: {}", e))
    } else if e.is_timeout() {
        RemoteError::Network("Connection timed out".to_string())
    } else if e.is_decode() {
        RemoteError::Decode(e.to_string())
    } else {
        RemoteError::Network(format!("Request failed: {}", e))
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message_from_body(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unexpected response")
            .to_string()
    });
    Err(RemoteError::Status {
        code: status.as_u16(),
        message,
    })
}

fn into_download(response: Response, cancel: &CancellationToken) -> Download {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_length = response.content_length();
    let chunks = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(map_request_error))
        .boxed();

    Download {
        content_type,
        content_length,
        chunks: cancellable(chunks, cancel.clone()),
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn connect(&self, credentials: &Credentials) -> Result<Session, RemoteError> {
        let server = credentials.normalized_server();
        let body = Credentials {
            server: server.clone(),
            ..credentials.clone()
        };

        let response = self
            .send(self.http_client.post(self.url("connect")).json(&body), None)
            .await?;
        let connected: ConnectResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("Failed to parse connect response: {}", e)))?;

        tracing::info!("Connected to {} as {}", server, credentials.username);
        Ok(Session {
            session_id: connected.session_id,
            server,
            username: credentials.username.clone(),
            current_path: credentials.path.clone(),
        })
    }

    async fn list_directory(
        &self,
        session: &Session,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileEntry>, RemoteError> {
        tracing::debug!("Listing {}", path);
        let request = self
            .http_client
            .get(self.url("list"))
            .query(&[("sessionId", session.session_id.as_str()), ("path", path)]);

        let listing: ListResponse = self
            .send(request, Some(cancel))
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("Failed to parse listing: {}", e)))?;
        Ok(listing.files)
    }

    async fn download_file(
        &self,
        session: &Session,
        path: &str,
        range_start: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<Download, RemoteError> {
        let mut request = self
            .http_client
            .get(self.url("download"))
            .query(&[("sessionId", session.session_id.as_str()), ("file", path)]);
        if let Some(offset) = range_start.filter(|offset| *offset > 0) {
            request = request.header(RANGE, format!("bytes={}-", offset));
        }
        tracing::debug!("Downloading {} from offset {:?}", path, range_start);

        let response = self.send(request, Some(cancel)).await?;
        Ok(into_download(response, cancel))
    }

    async fn download_batch(
        &self,
        session: &Session,
        paths: &[String],
        cancel: &CancellationToken,
    ) -> Result<Download, RemoteError> {
        let request = self
            .http_client
            .post(self.url("batch-download"))
            .header(ACCEPT, "application/zip")
            .json(&serde_json::json!({
                "sessionId": session.session_id,
                "paths": paths,
            }));
        tracing::debug!("Requesting archive of {} paths", paths.len());

        let response = self.send(request, Some(cancel)).await?;
        Ok(into_download(response, cancel))
    }

    async fn preview_file(
        &self,
        session: &Session,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<String, RemoteError> {
        let request = self
            .http_client
            .get(self.url("download"))
            .query(&[("sessionId", session.session_id.as_str()), ("file", path)]);

        let response = self.send(request, Some(cancel)).await?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RemoteError::Canceled),
            text = response.text() => text.map_err(map_request_error),
        }
    }

    async fn delete(
        &self,
        session: &Session,
        path: &str,
        is_directory: bool,
    ) -> Result<(), RemoteError> {
        let request = self.http_client.post(self.url("delete")).json(&serde_json::json!({
            "sessionId": session.session_id,
            "path": path,
            "isDirectory": is_directory,
        }));
        self.send(request, None).await?;
        tracing::info!("Deleted {}", path);
        Ok(())
    }

    async fn upload(
        &self,
        session: &Session,
        remote_dir: &str,
        local_file: &Path,
    ) -> Result<(), RemoteError> {
        let file_name = local_file
            .file_name()
            .ok_or_else(|| RemoteError::Io("Invalid file path".to_string()))?
            .to_string_lossy()
            .to_string();
        let data = tokio::fs::read(local_file).await?;

        let form = Form::new()
            .text("sessionId", session.session_id.clone())
            .text("path", remote_dir.to_string())
            .part("file", Part::bytes(data).file_name(file_name.clone()));

        self.send(self.http_client.post(self.url("upload")).multipart(form), None)
            .await?;
        tracing::info!("Uploaded {} to {}", file_name, remote_dir);
        Ok(())
    }

    async fn disconnect(&self, session: &Session) -> Result<(), RemoteError> {
        let request = self
            .http_client
            .post(self.url("disconnect"))
            .json(&serde_json::json!({ "sessionId": session.session_id }));
        self.send(request, None).await?;
        tracing::info!("Disconnected session on {}", session.server);
        Ok(())
    }
}

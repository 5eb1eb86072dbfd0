// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the backend SFTP proxy
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api/sftp";

/// A single entry returned by the directory listing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub is_directory: bool,
    pub path: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub modify_time: i64,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl FileEntry {
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.modify_time)
    }
}

/// Login form contents sent to the proxy's connect endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub path: String,
}

impl Credentials {
    /// Server host with any `ftp://` or `sftp://` prefix removed
    pub fn normalized_server(&self) -> String {
        let server = self.server.trim();
        for scheme in ["sftp://", "ftp://"] {
            if server
                .get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
            {
                return server[scheme.len()..].to_string();
            }
        }
        server.to_string()
    }
}

/// An authenticated session on the proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub server: String,
    pub username: String,
    pub current_path: String,
}

/// Client settings (frontend-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    /// Base URL of the SFTP proxy API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Where finished downloads are saved
    pub download_dir: PathBuf,
    /// Port pre-filled on the login form
    #[serde(default = "default_port")]
    pub default_port: u16,
    /// Connect timeout for the HTTP client. Reads are never timed out.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Files above this size are not previewed
    #[serde(default = "default_preview_limit_bytes")]
    pub preview_limit_bytes: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_preview_limit_bytes() -> u64 {
    2 * 1024 * 1024
}

impl Default for ClientSettings {
    fn default() -> Self {
        let download_dir = directories::UserDirs::new()
            .and_then(|d| d.download_dir().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            api_base_url: default_api_base_url(),
            download_dir,
            default_port: default_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
            preview_limit_bytes: default_preview_limit_bytes(),
        }
    }
}

/// Error types for the application layer
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileIo(err.to_string())
    }
}

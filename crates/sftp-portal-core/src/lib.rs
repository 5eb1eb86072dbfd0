// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Shared logic for all frontends
//
// This crate provides:
// - RemoteService and its HTTP implementation for the SFTP gateway
// - TransferController for starting, pausing, resuming and canceling downloads
// - TransferStore holding every task and publishing change events
// - DirectoryView and SelectionSet for browsing and batch selection
// - SettingsStore for persistent client settings
//
// Frontend-specific code lives in separate crates.

mod batch;
pub mod browser;
pub mod controller;
pub mod progress;
pub mod remote;
pub mod save;
pub mod selection;
pub mod settings;
pub mod store;
pub mod task;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use batch::ARCHIVE_NAME;
pub use browser::{DirectoryStats, DirectoryView, Preview};
pub use controller::{TransferController, TransferError};
pub use remote::{Download, HttpRemote, RemoteError, RemoteService};
pub use save::DownloadDir;
pub use selection::SelectionSet;
pub use settings::SettingsStore;
pub use store::{StoreEvent, TransferStore};
pub use task::{TransferKind, TransferStatus, TransferTask};
pub use types::{AppError, ClientSettings, Credentials, FileEntry, Session};

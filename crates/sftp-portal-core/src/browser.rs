// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Directory view
//
// Holds the one directory listing the user is looking at. Navigation
// replaces it wholesale and clears the selection.

use crate::remote::{RemoteError, RemoteService};
use crate::selection::{matches_search, SelectionSet};
use crate::types::{FileEntry, Session};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio_util::sync::CancellationToken;

/// Summary of the current listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
    pub folders: usize,
    pub files: usize,
    pub size: u64,
}

/// Result of asking for a file preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Text(String),
    TooLarge { limit: u64 },
}

#[derive(Debug, Default)]
struct Listing {
    path: String,
    entries: Vec<FileEntry>,
    stats: DirectoryStats,
}

/// The active directory listing and the selection made within it
pub struct DirectoryView {
    remote: Arc<dyn RemoteService>,
    session: Session,
    listing: RwLock<Listing>,
    selection: Mutex<SelectionSet>,
    preview_limit: u64,
}

impl DirectoryView {
    pub fn new(remote: Arc<dyn RemoteService>, session: Session, preview_limit: u64) -> Self {
        let listing = Listing {
            path: session.current_path.clone(),
            ..Listing::default()
        };
        Self {
            remote,
            session,
            listing: RwLock::new(listing),
            selection: Mutex::new(SelectionSet::new()),
            preview_limit,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// List `path` and make it the current directory.
    ///
    /// The selection is cleared whether or not listing succeeds. On failure
    /// the previous entries and path are kept.
    pub async fn navigate(&self, path: &str) -> Result<(), RemoteError> {
        let path = sanitize_path(path);
        let result = self
            .remote
            .list_directory(&self.session, &path, &CancellationToken::new())
            .await;
        self.selection().clear();

        let mut entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to list {}: {}", path, e);
                return Err(e);
            }
        };
        entries.sort_by(compare_entries);

        let stats = DirectoryStats {
            folders: entries.iter().filter(|e| e.is_directory).count(),
            files: entries.iter().filter(|e| !e.is_directory).count(),
            size: entries.iter().map(|e| e.size).sum(),
        };
        tracing::debug!("{} holds {} folders, {} files", path, stats.folders, stats.files);

        let mut listing = self.listing.write().unwrap_or_else(|e| e.into_inner());
        *listing = Listing {
            path,
            entries,
            stats,
        };
        Ok(())
    }

    pub async fn refresh(&self) -> Result<(), RemoteError> {
        let path = self.current_path();
        self.navigate(&path).await
    }

    pub async fn root(&self) -> Result<(), RemoteError> {
        self.navigate("/").await
    }

    /// Go up one level
    pub async fn parent(&self) -> Result<(), RemoteError> {
        let path = parent_path(&self.current_path());
        self.navigate(&path).await
    }

    pub fn current_path(&self) -> String {
        self.listing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .path
            .clone()
    }

    pub fn breadcrumbs(&self) -> Vec<String> {
        self.current_path()
            .split('/')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn entries(&self) -> Vec<FileEntry> {
        self.listing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .clone()
    }

    pub fn stats(&self) -> DirectoryStats {
        self.listing.read().unwrap_or_else(|e| e.into_inner()).stats
    }

    /// Entries whose name matches the search text
    pub fn filtered(&self, search: &str) -> Vec<FileEntry> {
        self.listing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .filter(|e| matches_search(e, search))
            .cloned()
            .collect()
    }

    /// Look up a currently listed file by its display name
    pub fn find_by_name(&self, name: &str) -> Option<FileEntry> {
        self.listing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .find(|e| e.name == name)
            .cloned()
    }

    /// Lock the selection for reading or editing
    pub fn selection(&self) -> MutexGuard<'_, SelectionSet> {
        self.selection.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn select_all(&self) {
        let entries = self.entries();
        self.selection().select_all(&entries);
    }

    pub fn select_visible(&self, search: &str) {
        let entries = self.entries();
        self.selection().select_visible(&entries, search);
    }

    /// Fetch a file's text, refusing files above the preview limit
    pub async fn preview(&self, entry: &FileEntry) -> Result<Preview, RemoteError> {
        if entry.size > self.preview_limit {
            return Ok(Preview::TooLarge {
                limit: self.preview_limit,
            });
        }
        let text = self
            .remote
            .preview_file(&self.session, &entry.path, &CancellationToken::new())
            .await?;
        Ok(Preview::Text(text))
    }
}

/// Trim and turn backslashes into forward slashes
pub fn sanitize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => trimmed[..index].to_string(),
    }
}

/// Directories first, then names in natural, case-insensitive order
fn compare_entries(a: &FileEntry, b: &FileEntry) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| natural_cmp(&a.name, &b.name))
}

/// Compare so that `file2` sorts before `file10`
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().flat_map(char::to_lowercase).peekable();
    let mut b = b.chars().flat_map(char::to_lowercase).peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let mut left = String::new();
                while let Some(c) = a.next_if(|c| c.is_ascii_digit()) {
                    left.push(c);
                }
                let mut right = String::new();
                while let Some(c) = b.next_if(|c| c.is_ascii_digit()) {
                    right.push(c);
                }
                let left = left.trim_start_matches('0');
                let right = right.trim_start_matches('0');
                let ordering = left.len().cmp(&right.len()).then_with(|| left.cmp(right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

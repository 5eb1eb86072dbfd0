// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Settings persistence
//
// Settings are stored in a local JSON file. Transfer state is never written
// here; it lives only as long as the process.

use crate::types::{AppError, ClientSettings};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// In-memory cache of settings, persisted to disk on changes
pub struct SettingsStore {
    settings: RwLock<ClientSettings>,
    file_path: PathBuf,
}

impl SettingsStore {
    /// Create a settings store in the user's config directory
    pub fn new() -> Result<Self, AppError> {
        Self::open(Self::get_settings_path()?)
    }

    /// Open a settings file, writing defaults to it when it does not exist yet
    pub fn open(file_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let file_path = file_path.into();
        let existing = file_path.exists();
        tracing::debug!("Using settings at {:?} (exists: {})", file_path, existing);

        let settings = if existing {
            load(&file_path)?
        } else {
            ClientSettings::default()
        };
        let store = Self {
            settings: RwLock::new(settings),
            file_path,
        };
        if !existing {
            store.persist()?;
        }
        Ok(store)
    }

    fn get_settings_path() -> Result<PathBuf, AppError> {
        let config_dir = directories::ProjectDirs::from("org", "sftp-portal", "sftp-portal")
            .ok_or_else(|| AppError::FileIo("Could not determine config directory".to_string()))?
            .config_dir()
            .to_path_buf();

        Ok(config_dir.join("settings.json"))
    }

    /// Write the cached settings to the settings file
    fn persist(&self) -> Result<(), AppError> {
        let json = {
            let settings = self.settings.read().unwrap_or_else(|e| e.into_inner());
            serde_json::to_vec_pretty(&*settings)
                .map_err(|e| AppError::Serialization(format!("Cannot encode settings: {}", e)))?
        };

        if let Some(dir) = self.file_path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| AppError::FileIo(format!("Cannot create {:?}: {}", dir, e)))?;
        }
        fs::write(&self.file_path, json)
            .map_err(|e| AppError::FileIo(format!("Cannot write {:?}: {}", self.file_path, e)))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Get current settings
    pub fn get(&self) -> ClientSettings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace settings and persist to disk
    pub fn update(&self, new_settings: ClientSettings) -> Result<(), AppError> {
        if new_settings.api_base_url.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "API base URL must not be empty".to_string(),
            ));
        }

        {
            let mut settings = self.settings.write().unwrap_or_else(|e| e.into_inner());
            *settings = new_settings;
        }

        let result = self.persist();
        if let Err(e) = &result {
            tracing::error!("Failed to persist settings: {}", e);
        }
        result
    }
}

/// Read a settings file; unparseable content yields the defaults
fn load(path: &Path) -> Result<ClientSettings, AppError> {
    let raw = fs::read(path)
        .map_err(|e| AppError::FileIo(format!("Cannot read {:?}: {}", path, e)))?;

    match serde_json::from_slice(&raw) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!("Ignoring malformed settings in {:?}: {}", path, e);
            Ok(ClientSettings::default())
        }
    }
}

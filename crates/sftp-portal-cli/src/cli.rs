// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal CLI - Command line arguments

use clap::{Args, Parser, Subcommand};
use sftp_portal_core::{ClientSettings, Credentials};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sftp-portal", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub login: LoginArgs,

    /// Settings file to use instead of the one in the config directory
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Base URL of the proxy API for this run
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Directory to save downloads into for this run
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// SFTP server, with or without an sftp:// prefix
    #[arg(short = 'H', long, env = "SFTP_PORTAL_SERVER", global = true)]
    pub server: Option<String>,

    #[arg(short, long, env = "SFTP_PORTAL_PORT", global = true)]
    pub port: Option<u16>,

    #[arg(short, long, env = "SFTP_PORTAL_USER", global = true)]
    pub username: Option<String>,

    #[arg(long, env = "SFTP_PORTAL_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List a remote directory
    #[command(alias = "ls", name = "list")]
    List {
        #[arg(default_value = "/")]
        path: String,
        /// Only show names containing this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Download files from one directory
    #[command(alias = "get", name = "download")]
    Download {
        dir: String,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Download the files of a directory as one archive
    #[command(name = "batch")]
    Batch {
        dir: String,
        /// Only include names containing this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Print a small text file
    #[command(alias = "cat", name = "preview")]
    Preview { path: String },
    /// Delete a remote file or directory
    #[command(alias = "rm", name = "remove")]
    Remove { path: String },
    /// Upload a local file into a remote directory
    #[command(alias = "put", name = "upload")]
    Upload {
        file: PathBuf,
        #[arg(default_value = "/")]
        remote_dir: String,
    },
    /// Show the effective settings
    #[command(alias = "cfg", name = "config")]
    Config {
        /// Write the command line overrides to the settings file
        #[arg(long)]
        save: bool,
    },
}

impl Cli {
    /// Settings with this run's overrides applied
    pub fn apply_overrides(&self, mut settings: ClientSettings) -> ClientSettings {
        if let Some(url) = &self.api_base_url {
            settings.api_base_url = url.clone();
        }
        if let Some(dir) = &self.download_dir {
            settings.download_dir = dir.clone();
        }
        settings
    }
}

impl LoginArgs {
    /// Build the login request, naming the first missing field on failure
    pub fn credentials(&self, default_port: u16) -> Result<Credentials, String> {
        let server = self
            .server
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or("--server is required")?;
        let username = self.username.clone().ok_or("--username is required")?;
        let password = self.password.clone().ok_or("--password is required")?;

        Ok(Credentials {
            server,
            port: self.port.unwrap_or(default_port),
            username,
            password,
            path: "/".to_string(),
        })
    }
}

/// A command typed into the transfer panel while downloads run.
/// Task numbers are 1-based positions in the printed panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    Pause(usize),
    Resume(usize),
    Cancel(usize),
    DismissAll,
    /// Change the listed directory; `/` goes to the root
    Cd(String),
    Up,
    Refresh,
}

impl PanelCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next()?;
        let arg = words.next();
        if words.next().is_some() {
            return None;
        }

        match (verb, arg) {
            ("dismiss", None) | ("cancel", Some("all")) => Some(Self::DismissAll),
            ("cd", Some(path)) => Some(Self::Cd(path.to_string())),
            ("up", None) => Some(Self::Up),
            ("refresh", None) => Some(Self::Refresh),
            ("p" | "pause", Some(n)) => n.parse().ok().filter(|n| *n > 0).map(Self::Pause),
            ("r" | "resume", Some(n)) => n.parse().ok().filter(|n| *n > 0).map(Self::Resume),
            ("c" | "cancel", Some(n)) => n.parse().ok().filter(|n| *n > 0).map(Self::Cancel),
            _ => None,
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal CLI - Main entry point
//
// Logs in through the proxy, runs one command and renders the transfer
// panel as text while downloads are in flight.

mod cli;
mod render;

use clap::Parser;
use cli::{Cli, Commands, PanelCommand};
use sftp_portal_core::{
    AppError, DirectoryView, DownloadDir, HttpRemote, Preview, RemoteError, RemoteService,
    Session, SettingsStore, TransferController, TransferStatus,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("{}", .0.display_message())]
    Remote(#[from] RemoteError),

    #[error("{0}")]
    Usage(String),

    #[error("{0} transfer(s) did not complete")]
    Incomplete(usize),
}

impl CliError {
    fn is_retryable(&self) -> bool {
        matches!(self, CliError::Remote(e) if e.is_retryable())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sftp_portal=warn".parse().unwrap())
                .add_directive("sftp_portal_core=warn".parse().unwrap()),
        )
        .init();

    tracing::info!("Starting SFTP Portal v{}", env!("CARGO_PKG_VERSION"));

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.is_retryable() {
                eprintln!("(temporary failure, try again)");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let store = match &cli.settings {
        Some(path) => SettingsStore::open(path)?,
        None => SettingsStore::new()?,
    };
    let settings = cli.apply_overrides(store.get());

    if let Commands::Config { save } = cli.cmd {
        if save {
            store.update(settings.clone())?;
            println!("Saved to {}", store.path().display());
        }
        println!("api base url:   {}", settings.api_base_url);
        println!("download dir:   {}", settings.download_dir.display());
        println!("default port:   {}", settings.default_port);
        println!("connect timeout {}s", settings.connect_timeout_secs);
        println!("preview limit:  {} bytes", settings.preview_limit_bytes);
        return Ok(());
    }

    let credentials = cli
        .login
        .credentials(settings.default_port)
        .map_err(CliError::Usage)?;

    let remote: Arc<dyn RemoteService> = Arc::new(HttpRemote::new(&settings)?);
    let session = remote.connect(&credentials).await?;
    tracing::info!("Connected to {} as {}", session.server, session.username);

    let view = Arc::new(DirectoryView::new(
        remote.clone(),
        session.clone(),
        settings.preview_limit_bytes,
    ));
    let controller = TransferController::new(
        remote.clone(),
        view.clone(),
        DownloadDir::new(&settings.download_dir),
    );

    let result = execute(cli.cmd, remote.as_ref(), &session, &controller).await;

    controller.shutdown();
    if let Err(e) = remote.disconnect(&session).await {
        tracing::warn!("Failed to disconnect: {}", e);
    }
    result
}

async fn execute(
    cmd: Commands,
    remote: &dyn RemoteService,
    session: &Session,
    controller: &TransferController,
) -> Result<(), CliError> {
    let view = controller.view();

    match cmd {
        Commands::List { path, search } => {
            view.navigate(&path).await?;
            println!("{}", render::breadcrumb_line(&view.breadcrumbs()));
            for entry in view.filtered(search.as_deref().unwrap_or_default()) {
                println!("{}", render::entry_line(&entry));
            }
            println!("{}", render::stats_line(&view.stats()));
        }
        Commands::Download { dir, names } => {
            view.navigate(&dir).await?;
            for name in &names {
                match view.find_by_name(name).filter(|e| !e.is_directory) {
                    Some(entry) => {
                        controller.start(&entry);
                    }
                    None => eprintln!("{} is not a file in {}", name, view.current_path()),
                }
            }
            println!("Saving to {}", controller.downloads().root().display());
            watch(controller).await?;
        }
        Commands::Batch { dir, search } => {
            view.navigate(&dir).await?;
            match &search {
                Some(search) => view.select_visible(search),
                None => view.select_all(),
            }
            if controller.start_batch().is_none() {
                return Err(CliError::Usage(format!("No files to download in {}", dir)));
            }
            println!("Saving to {}", controller.downloads().root().display());
            watch(controller).await?;
        }
        Commands::Preview { path } => {
            let (dir, name) = split_remote_path(&path);
            view.navigate(dir).await?;
            let entry = view
                .find_by_name(name)
                .filter(|e| !e.is_directory)
                .ok_or_else(|| CliError::Usage(format!("{} is not a file", path)))?;

            match view.preview(&entry).await? {
                Preview::Text(text) => print!("{}", text),
                Preview::TooLarge { limit } => {
                    return Err(CliError::Usage(format!(
                        "File is too large to preview (limit {})",
                        sftp_portal_core::progress::format_bytes(limit)
                    )));
                }
            }
        }
        Commands::Remove { path } => {
            let (dir, name) = split_remote_path(&path);
            view.navigate(dir).await?;
            let entry = view
                .find_by_name(name)
                .ok_or_else(|| CliError::Usage(format!("{} not found", path)))?;
            remote
                .delete(session, &entry.path, entry.is_directory)
                .await?;
            println!("Deleted {}", entry.path);
        }
        Commands::Upload { file, remote_dir } => {
            remote.upload(session, &remote_dir, &file).await?;
            println!("Uploaded {} to {}", file.display(), remote_dir);
        }
        Commands::Config { .. } => {}
    }
    Ok(())
}

/// Render the transfer panel until nothing is left downloading.
///
/// Panel commands are read from stdin; Ctrl-C cancels every transfer.
async fn watch(controller: &TransferController) -> Result<(), CliError> {
    let mut events = controller.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut tick = tokio::time::interval(Duration::from_millis(500));
    let mut last_statuses = Vec::new();

    loop {
        let tasks = controller.tasks();
        let paused = tasks.iter().any(|t| t.status == TransferStatus::Paused);
        if controller.active_count() == 0 && !(paused && stdin_open) {
            break;
        }

        tokio::select! {
            event = events.recv() => match event {
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    let statuses: Vec<_> = controller
                        .tasks()
                        .iter()
                        .map(|t| (t.id.clone(), t.status))
                        .collect();
                    if statuses != last_statuses {
                        print_panel(controller);
                        last_statuses = statuses;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            _ = tick.tick() => print_panel(controller),
            line = input.next_line(), if stdin_open => match line {
                Ok(Some(line)) => apply_panel_command(controller, &line).await,
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Canceling transfers");
                controller.shutdown();
            }
        }
    }

    print_panel(controller);
    let incomplete = controller
        .tasks()
        .iter()
        .filter(|t| t.status != TransferStatus::Completed)
        .count();
    if incomplete > 0 {
        return Err(CliError::Incomplete(incomplete));
    }
    Ok(())
}

fn print_panel(controller: &TransferController) {
    let tasks = controller.tasks();
    if tasks.is_empty() {
        return;
    }
    println!("Transfers ({} active)", controller.active_count());
    for (index, task) in tasks.iter().enumerate() {
        println!("{}", render::task_line(index + 1, task));
    }
}

async fn apply_panel_command(controller: &TransferController, line: &str) {
    let Some(command) = PanelCommand::parse(line) else {
        eprintln!("Commands: pause N, resume N, cancel N, cancel all, cd PATH, up, refresh");
        return;
    };

    let view = controller.view();
    let moved = match &command {
        PanelCommand::Cd(path) if path == "/" => Some(view.root().await),
        PanelCommand::Cd(path) => Some(view.navigate(path).await),
        PanelCommand::Up => Some(view.parent().await),
        PanelCommand::Refresh => Some(view.refresh().await),
        _ => None,
    };
    match moved {
        Some(Ok(())) => {
            println!(
                "{}  ({})",
                render::breadcrumb_line(&view.breadcrumbs()),
                render::stats_line(&view.stats())
            );
            return;
        }
        Some(Err(e)) => {
            eprintln!("{}", e.display_message());
            return;
        }
        None => {}
    }

    let tasks = controller.tasks();
    let task_at = |n: usize| tasks.get(n - 1).map(|t| t.id.as_str());
    match command {
        PanelCommand::Pause(n) => {
            if let Some(id) = task_at(n) {
                controller.pause(id);
            }
        }
        PanelCommand::Resume(n) => {
            if let Some(id) = task_at(n) {
                controller.resume(id);
            }
        }
        PanelCommand::Cancel(n) => {
            if let Some(id) = task_at(n) {
                controller.cancel(id);
            }
        }
        PanelCommand::DismissAll => controller.dismiss_all(),
        PanelCommand::Cd(_) | PanelCommand::Up | PanelCommand::Refresh => {}
    }
}

/// Split `/a/b/name` into (`/a/b`, `name`)
fn split_remote_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => ("/", &trimmed[1..]),
        Some(index) => (&trimmed[..index], &trimmed[index + 1..]),
        None => ("/", trimmed),
    }
}

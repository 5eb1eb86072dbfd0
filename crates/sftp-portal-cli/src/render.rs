// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal CLI - Text rendering for listings and the transfer panel

use sftp_portal_core::progress::format_bytes;
use sftp_portal_core::{DirectoryStats, FileEntry, TransferStatus, TransferTask};

pub fn entry_line(entry: &FileEntry) -> String {
    let modified = entry
        .modified_at()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    if entry.is_directory {
        format!("{:>10}  {:16}  {}/", "-", modified, entry.name)
    } else {
        format!("{:>10}  {:16}  {}", format_bytes(entry.size), modified, entry.name)
    }
}

/// `/ data / runs` for `/data/runs`
pub fn breadcrumb_line(crumbs: &[String]) -> String {
    if crumbs.is_empty() {
        "/".to_string()
    } else {
        format!("/ {}", crumbs.join(" / "))
    }
}

pub fn stats_line(stats: &DirectoryStats) -> String {
    format!(
        "{} folders, {} files, {}",
        stats.folders,
        stats.files,
        format_bytes(stats.size)
    )
}

/// One row of the transfer panel; `number` is what panel commands refer to
pub fn task_line(number: usize, task: &TransferTask) -> String {
    let head = format!("{:>2}. [{}] {}", number, task.status.as_str(), task.name);

    match task.status {
        TransferStatus::Downloading => format!(
            "{}  {}%  {} / {}  {}/s  ETA {}",
            head,
            task.progress,
            format_bytes(task.bytes_transferred),
            size_text(task.size),
            format_bytes(task.speed),
            task.eta()
        ),
        TransferStatus::Paused => {
            let mut line = format!(
                "{}  {}%  {} / {}",
                head,
                task.progress,
                format_bytes(task.bytes_transferred),
                size_text(task.size)
            );
            if let Some(detail) = &task.detail {
                line.push_str(&format!("  ({})", detail));
            }
            line
        }
        TransferStatus::Completed => match &task.saved_to {
            Some(path) => format!("{}  {}  -> {}", head, format_bytes(task.size), path.display()),
            None => format!("{}  {}", head, format_bytes(task.size)),
        },
        TransferStatus::Error => format!(
            "{}  {}",
            head,
            task.detail.as_deref().unwrap_or("Download failed")
        ),
        TransferStatus::Canceled => head,
    }
}

fn size_text(size: u64) -> String {
    if size == 0 {
        "?".to_string()
    } else {
        format_bytes(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TransferStatus) -> TransferTask {
        let mut task = TransferTask::single(&FileEntry {
            name: "reads.fastq".to_string(),
            size: 2048,
            is_directory: false,
            path: "/runs/reads.fastq".to_string(),
            modify_time: 0,
            kind: "-".to_string(),
        });
        task.status = status;
        task
    }

    #[test]
    fn test_downloading_line() {
        let mut t = task(TransferStatus::Downloading);
        t.bytes_transferred = 1024;
        t.progress = 50;
        t.speed = 512;

        assert_eq!(
            task_line(1, &t),
            " 1. [downloading] reads.fastq  50%  1 KB / 2 KB  512 B/s  ETA 0:02"
        );
    }

    #[test]
    fn test_paused_line_shows_notice() {
        let mut t = task(TransferStatus::Paused);
        t.detail = Some("reads.fastq is no longer listed in the current directory".to_string());

        let line = task_line(3, &t);
        assert!(line.starts_with(" 3. [paused] reads.fastq  0%"));
        assert!(line.ends_with("(reads.fastq is no longer listed in the current directory)"));
    }

    #[test]
    fn test_error_line() {
        let mut t = task(TransferStatus::Error);
        t.detail = Some("disk full".to_string());
        assert_eq!(task_line(2, &t), " 2. [error] reads.fastq  disk full");
    }

    #[test]
    fn test_unknown_size() {
        let mut t = TransferTask::batch(vec!["/a".to_string()]);
        t.bytes_transferred = 10;
        assert!(task_line(1, &t).contains("10 B / ?"));
    }

    #[test]
    fn test_directory_entry() {
        let entry = FileEntry {
            name: "runs".to_string(),
            size: 4096,
            is_directory: true,
            path: "/runs".to_string(),
            modify_time: 0,
            kind: "d".to_string(),
        };
        assert!(entry_line(&entry).ends_with("  runs/"));
    }

    #[test]
    fn test_breadcrumb_line() {
        assert_eq!(breadcrumb_line(&[]), "/");
        assert_eq!(
            breadcrumb_line(&["data".to_string(), "runs".to_string()]),
            "/ data / runs"
        );
    }

    #[test]
    fn test_stats_line() {
        let stats = DirectoryStats {
            folders: 2,
            files: 3,
            size: 1536,
        };
        assert_eq!(stats_line(&stats), "2 folders, 3 files, 1.5 KB");
    }
}

// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Selection model for batch actions

use crate::types::FileEntry;

/// Remote paths of the files marked for a batch action, in the order they
/// were picked. Directories are never members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    paths: Vec<String>,
}

/// Case-insensitive substring match used by the search box
pub fn matches_search(entry: &FileEntry, search: &str) -> bool {
    entry.name.to_lowercase().contains(&search.to_lowercase())
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of a file. Returns whether it is now selected;
    /// directories are refused and always yield false.
    pub fn toggle(&mut self, entry: &FileEntry) -> bool {
        if entry.is_directory {
            return false;
        }
        if let Some(index) = self.paths.iter().position(|p| *p == entry.path) {
            self.paths.remove(index);
            false
        } else {
            self.paths.push(entry.path.clone());
            true
        }
    }

    /// Replace the selection with every listed file
    pub fn select_all(&mut self, entries: &[FileEntry]) {
        self.paths = entries
            .iter()
            .filter(|e| !e.is_directory)
            .map(|e| e.path.clone())
            .collect();
    }

    /// Replace the selection with the listed files matching `search`
    pub fn select_visible(&mut self, entries: &[FileEntry], search: &str) {
        self.paths = entries
            .iter()
            .filter(|e| matches_search(e, search))
            .filter(|e| !e.is_directory)
            .map(|e| e.path.clone())
            .collect();
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            size: 1,
            is_directory: false,
            path: format!("/data/{}", name),
            modify_time: 0,
            kind: "-".to_string(),
        }
    }

    fn dir(name: &str) -> FileEntry {
        FileEntry {
            is_directory: true,
            kind: "d".to_string(),
            ..file(name)
        }
    }

    #[test]
    fn test_select_visible_skips_directories() {
        let entries = vec![file("a.bam"), file("b.txt"), dir("bams")];
        let mut selection = SelectionSet::new();

        selection.select_visible(&entries, "bam");
        assert_eq!(selection.paths(), ["/data/a.bam".to_string()]);
    }

    #[test]
    fn test_select_visible_is_case_insensitive() {
        let entries = vec![file("Sample.BAM"), file("notes.txt")];
        let mut selection = SelectionSet::new();

        selection.select_visible(&entries, "bam");
        assert!(selection.contains("/data/Sample.BAM"));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_select_all_files_only() {
        let entries = vec![dir("runs"), file("a.vcf"), file("b.vcf")];
        let mut selection = SelectionSet::new();
        selection.toggle(&entries[1]);

        selection.select_all(&entries);
        assert_eq!(selection.len(), 2);
        assert!(!selection.contains("/data/runs"));
    }

    #[test]
    fn test_toggle() {
        let mut selection = SelectionSet::new();
        let a = file("a.bed");

        assert!(selection.toggle(&a));
        assert!(selection.contains(&a.path));
        assert!(!selection.toggle(&a));
        assert!(selection.is_empty());

        assert!(!selection.toggle(&dir("runs")));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut selection = SelectionSet::new();
        selection.select_all(&[file("a"), file("b")]);
        selection.clear();
        assert!(selection.is_empty());
    }
}

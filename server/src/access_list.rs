//! IP allow/deny membership backed by a plain text file.
//!
//! The file holds one address literal per line. It is read once when the list
//! is loaded and only rewritten (wholesale, in no particular order) when
//! [`AccessList::persist`] is called.

use log::{error, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AccessMode {
    /// Only listed addresses may join
    #[value(name = "allow")]
    AllowOnly,
    /// Listed addresses are refused, everyone else may join
    #[value(name = "deny")]
    DenyOnly,
}

#[derive(Debug, Clone)]
pub struct AccessList {
    entries: HashSet<String>,
    path: Option<PathBuf>,
    mode: AccessMode,
}

impl AccessList {
    /// An empty in-memory list with nowhere to persist to.
    pub fn new(mode: AccessMode) -> Self {
        Self {
            entries: HashSet::new(),
            path: None,
            mode,
        }
    }

    /// Reads the list from `path`.
    ///
    /// A file that cannot be read is logged and leaves the list empty, which
    /// denies everyone in allow-only mode and admits everyone in deny-only mode.
    pub fn load(path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        let path = path.into();
        let mut list = Self {
            entries: HashSet::new(),
            path: Some(path.clone()),
            mode,
        };

        match fs::read_to_string(&path) {
            Ok(contents) => {
                list.entries = contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                info!(
                    "Loaded {} access list entries from {} ({:?})",
                    list.entries.len(),
                    path.display(),
                    mode
                );
            }
            Err(e) => {
                error!(
                    "Failed to read access list {}: {} (continuing with an empty {:?} list)",
                    path.display(),
                    e,
                    mode
                );
            }
        }

        list
    }

    /// Applies the mode to a membership check.
    pub fn allowed(&self, ip: &str) -> bool {
        match self.mode {
            AccessMode::AllowOnly => self.contains(ip),
            AccessMode::DenyOnly => !self.contains(ip),
        }
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.entries.contains(ip)
    }

    /// Returns true if the address was not already listed.
    pub fn add(&mut self, ip: impl Into<String>) -> bool {
        self.entries.insert(ip.into())
    }

    /// Returns true if the address was listed.
    pub fn remove(&mut self, ip: &str) -> bool {
        self.entries.remove(ip)
    }

    /// Rewrites the backing file with the current entries.
    ///
    /// Best effort: failures are logged and reported as `false`, never raised.
    pub fn persist(&self) -> bool {
        let Some(path) = &self.path else {
            warn!("Access list has no backing file, nothing persisted");
            return false;
        };

        let mut contents = String::new();
        for entry in &self.entries {
            contents.push_str(entry);
            contents.push('\n');
        }

        match fs::write(path, contents) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to persist access list to {}: {}", path.display(), e);
                false
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Points future [`persist`](Self::persist) calls at another file.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn list_file(lines: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(lines.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_trims_and_skips_blank_lines() {
        let file = list_file("127.0.0.1\n  10.0.0.2  \n\n::1\n");
        let list = AccessList::load(file.path(), AccessMode::AllowOnly);

        assert_eq!(list.len(), 3);
        assert!(list.contains("127.0.0.1"));
        assert!(list.contains("10.0.0.2"));
        assert!(list.contains("::1"));
    }

    #[test]
    fn test_allow_only_mode() {
        let file = list_file("127.0.0.1\n");
        let list = AccessList::load(file.path(), AccessMode::AllowOnly);

        assert!(list.allowed("127.0.0.1"));
        assert!(!list.allowed("192.168.1.20"));
    }

    #[test]
    fn test_deny_only_mode() {
        let file = list_file("127.0.0.1\n");
        let list = AccessList::load(file.path(), AccessMode::DenyOnly);

        assert!(!list.allowed("127.0.0.1"));
        assert!(list.allowed("192.168.1.20"));
    }

    #[test]
    fn test_missing_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");

        let allow = AccessList::load(&missing, AccessMode::AllowOnly);
        assert!(allow.is_empty());
        assert!(!allow.allowed("127.0.0.1"));

        let deny = AccessList::load(&missing, AccessMode::DenyOnly);
        assert!(deny.is_empty());
        assert!(deny.allowed("127.0.0.1"));
    }

    #[test]
    fn test_add_and_remove_report_changes() {
        let mut list = AccessList::new(AccessMode::DenyOnly);

        assert!(list.add("10.0.0.1"));
        assert!(!list.add("10.0.0.1"));
        assert!(!list.allowed("10.0.0.1"));

        assert!(list.remove("10.0.0.1"));
        assert!(!list.remove("10.0.0.1"));
        assert!(list.allowed("10.0.0.1"));
    }

    #[test]
    fn test_persist_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.txt");

        let mut list = AccessList::new(AccessMode::AllowOnly);
        list.set_path(&path);
        list.add("127.0.0.1");
        list.add("10.1.1.1");
        assert!(list.persist());

        let reloaded = AccessList::load(&path, AccessMode::AllowOnly);
        let mut entries: Vec<&str> = reloaded.iter().collect();
        entries.sort();
        assert_eq!(entries, vec!["10.1.1.1", "127.0.0.1"]);
    }

    #[test]
    fn test_persist_without_path_fails_softly() {
        let list = AccessList::new(AccessMode::AllowOnly);
        assert!(!list.persist());
    }

    #[test]
    fn test_persist_to_unwritable_path_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = AccessList::new(AccessMode::AllowOnly);
        // a directory cannot be written as a file
        list.set_path(dir.path());
        list.add("127.0.0.1");
        assert!(!list.persist());
    }
}

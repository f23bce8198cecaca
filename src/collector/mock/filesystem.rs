//! In-memory filesystem used to feed the `/proc` counter source in tests.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Shared handle so a test can advance counters while a sampler reads them.
pub type SharedMockFs = Arc<RwLock<MockFs>>;

/// In-memory filesystem for testing.
///
/// Files and directories live in maps; tests mutate them between sampling
/// cycles to simulate counters advancing and processes starting or exiting.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file. Parent directories are created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory and its parents.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Removes a single file, leaving its directory in place.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Adds a process with the `/proc/[pid]/` files the counter source reads.
    ///
    /// An empty `io` leaves `/proc/[pid]/io` absent, like an unprivileged
    /// reader looking at another user's process.
    pub fn add_process(&mut self, pid: u32, stat: &str, status: &str, io: &str, comm: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
        if !io.is_empty() {
            self.add_file(base.join("io"), io);
        }
        self.add_file(base.join("comm"), comm);
    }

    /// Removes `/proc/[pid]` and everything below it.
    pub fn remove_process(&mut self, pid: u32) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.files.retain(|path, _| !path.starts_with(&base));
        self.directories.retain(|path| !path.starts_with(&base));
    }

    pub fn into_shared(self) -> SharedMockFs {
        Arc::new(RwLock::new(self))
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let is_child = |candidate: &PathBuf| candidate.parent().is_some_and(|p| p == path);

        let mut entries: HashSet<PathBuf> = self
            .files
            .keys()
            .filter(|p| is_child(p))
            .cloned()
            .collect();
        entries.extend(
            self.directories
                .iter()
                .filter(|p| is_child(p) && p.as_path() != path)
                .cloned(),
        );

        Ok(entries.into_iter().collect())
    }
}

impl FileSystem for SharedMockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.read()
            .unwrap_or_else(|e| e.into_inner())
            .read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.read().unwrap_or_else(|e| e.into_inner()).exists(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.read().unwrap_or_else(|e| e.into_inner()).read_dir(path)
    }
}

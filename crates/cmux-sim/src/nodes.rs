//! Placeholder device nodes
//!
//! Creating character devices needs root, so tests get regular files
//! holding `major:minor` instead. Removal goes through the real filesystem,
//! so a node deleted behind the daemon's back fails to unlink as it would
//! in production.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cmux_link::NodeBackend;

#[derive(Debug, Default)]
struct NodeLog {
    created: Vec<PathBuf>,
    removed: Vec<PathBuf>,
    failing_minors: HashSet<u32>,
}

/// Node backend writing plain files; clones share one log
#[derive(Debug, Clone, Default)]
pub struct PlaceholderNodeBackend {
    log: Arc<Mutex<NodeLog>>,
}

impl PlaceholderNodeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make creation of `minor` fail
    pub fn failing_minor(self, minor: u32) -> Self {
        if let Ok(mut log) = self.log.lock() {
            log.failing_minors.insert(minor);
        }
        self
    }

    /// Paths created, in order
    pub fn created(&self) -> Vec<PathBuf> {
        self.log
            .lock()
            .map(|log| log.created.clone())
            .unwrap_or_default()
    }

    /// Paths successfully removed, in order
    pub fn removed(&self) -> Vec<PathBuf> {
        self.log
            .lock()
            .map(|log| log.removed.clone())
            .unwrap_or_default()
    }
}

impl NodeBackend for PlaceholderNodeBackend {
    fn create_char_node(&self, path: &Path, major: u32, minor: u32) -> io::Result<()> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| io::Error::other("node log poisoned"))?;
        if log.failing_minors.contains(&minor) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated mknod failure",
            ));
        }
        std::fs::write(path, format!("{}:{}", major, minor))?;
        log.created.push(path.to_path_buf());
        Ok(())
    }

    fn remove_node(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)?;
        if let Ok(mut log) = self.log.lock() {
            log.removed.push(path.to_path_buf());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmux_link::{DeviceNodes, NodeLayout};

    #[test]
    fn test_creates_and_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = format!("{}/ttyGSM", dir.path().display());
        let backend = PlaceholderNodeBackend::new();

        let mut nodes = DeviceNodes::create(backend.clone(), 247, NodeLayout::new(&base, 2));
        assert_eq!(nodes.created(), 2);
        let contents = std::fs::read_to_string(format!("{}2", base)).unwrap();
        assert_eq!(contents, "247:2");

        nodes.remove();
        assert_eq!(backend.removed().len(), 2);
        assert!(!Path::new(&format!("{}1", base)).exists());
    }
}

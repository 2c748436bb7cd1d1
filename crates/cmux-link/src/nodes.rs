//! Device node lifecycle
//!
//! Finds the major number of the multiplexer's tty driver and creates one
//! character node per logical channel, `{base}1` through `{base}{count}`.
//! Minor 0 is the control channel and never gets a node. Creation and
//! removal are best-effort: failures are logged and never abort the daemon.

use std::ffi::CString;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::LinkError;

/// Registry of character and block device majors
pub const DEVICE_REGISTRY: &str = "/proc/devices";

/// Most modems handle up to four multiplexed channels
pub const MAX_NODES: u8 = 4;

/// Find the major of the first registry line containing `driver`
///
/// Lines look like `"247 gsmtty"`. A matching line that does not parse as
/// `<major> <name>` is skipped. Lines are matched as bytes, so non-UTF-8
/// entries elsewhere in the registry are harmless.
pub fn find_major<R: BufRead>(registry: R, driver: &str) -> io::Result<Option<u32>> {
    let needle = driver.as_bytes();
    for line in registry.split(b'\n') {
        let line = line?;
        if !contains(&line, needle) {
            continue;
        }
        if let Some(major) = parse_registry_line(&String::from_utf8_lossy(&line)) {
            return Ok(Some(major));
        }
    }
    Ok(None)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

fn parse_registry_line(line: &str) -> Option<u32> {
    let mut fields = line.split_whitespace();
    let major = fields.next()?.parse().ok()?;
    fields.next()?;
    Some(major)
}

/// Look up `driver` in the registry file at `path`
pub fn discover_major(path: &Path, driver: &str) -> Result<u32, LinkError> {
    let registry_err = |source| LinkError::Registry {
        path: path.display().to_string(),
        source,
    };

    let file = File::open(path).map_err(registry_err)?;
    let major = find_major(BufReader::new(file), driver)
        .map_err(registry_err)?
        .ok_or_else(|| LinkError::MajorNotFound {
            driver: driver.to_string(),
        })?;

    debug!("Driver {} has major {}", driver, major);
    Ok(major)
}

/// Where nodes go and how many
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLayout {
    pub base: String,
    pub count: u8,
}

impl NodeLayout {
    pub fn new(base: impl Into<String>, count: u8) -> Self {
        Self {
            base: base.into(),
            count,
        }
    }

    /// `(minor, path)` for every node, minors starting at 1
    pub fn nodes(&self) -> impl Iterator<Item = (u32, PathBuf)> + '_ {
        (1..=u32::from(self.count))
            .map(|minor| (minor, PathBuf::from(format!("{}{}", self.base, minor))))
    }
}

/// Filesystem operations behind node creation
pub trait NodeBackend {
    /// Create a character special file for `(major, minor)` at `path`
    fn create_char_node(&self, path: &Path, major: u32, minor: u32) -> io::Result<()>;

    /// Remove the node at `path`
    fn remove_node(&self, path: &Path) -> io::Result<()>;
}

/// Real device nodes via mknod(2), world read/write
///
/// Mode 0666 so unprivileged applications can open the channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharDeviceBackend;

impl NodeBackend for CharDeviceBackend {
    fn create_char_node(&self, path: &Path, major: u32, minor: u32) -> io::Result<()> {
        let c_path = CString::new(path.as_os_str().as_bytes())?;

        // SAFETY: c_path is a valid NUL-terminated string; umask is restored
        let rc = unsafe {
            let old_mask = libc::umask(0);
            let device = libc::makedev(major, minor);
            let rc = libc::mknod(c_path.as_ptr(), libc::S_IFCHR | 0o666, device);
            libc::umask(old_mask);
            rc
        };

        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn remove_node(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Created channel nodes, removed on [`DeviceNodes::remove`] or drop
#[derive(Debug)]
pub struct DeviceNodes<B: NodeBackend> {
    backend: B,
    layout: NodeLayout,
    major: u32,
    created: usize,
    removed: bool,
}

impl<B: NodeBackend> DeviceNodes<B> {
    /// Create every node in `layout`, logging the ones that fail
    pub fn create(backend: B, major: u32, layout: NodeLayout) -> Self {
        let mut created = 0;
        for (minor, path) in layout.nodes() {
            match backend.create_char_node(&path, major, minor) {
                Ok(()) => {
                    created += 1;
                    debug!("Created {}", path.display());
                }
                Err(e) => warn!("Cannot create {}: {}", path.display(), e),
            }
        }

        Self {
            backend,
            layout,
            major,
            created,
            removed: false,
        }
    }

    /// Nodes successfully created
    pub fn created(&self) -> usize {
        self.created
    }

    /// Nodes asked for
    pub fn requested(&self) -> usize {
        usize::from(self.layout.count)
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Unlink every numbered node; failures are logged and skipped
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        for (_, path) in self.layout.nodes() {
            debug!("Removing {}", path.display());
            if let Err(e) = self.backend.remove_node(&path) {
                warn!("Cannot remove {}: {}", path.display(), e);
            }
        }
    }
}

impl<B: NodeBackend> Drop for DeviceNodes<B> {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    const REGISTRY: &str = "Character devices:
  1 mem
  4 /dev/vc/0
  4 tty
  5 /dev/tty
 10 misc
189 usb_device
247 gsmtty
250 ttyGSM

Block devices:
  8 sd
";

    #[test]
    fn test_find_major() {
        let major = find_major(Cursor::new(REGISTRY), "gsmtty").unwrap();
        assert_eq!(major, Some(247));
    }

    #[test]
    fn test_substring_match_first_wins() {
        // "tty" appears in several lines; the first parseable one wins
        let major = find_major(Cursor::new(REGISTRY), "tty").unwrap();
        assert_eq!(major, Some(4));
    }

    #[test]
    fn test_missing_driver() {
        let major = find_major(Cursor::new(REGISTRY), "ttyMUX").unwrap();
        assert_eq!(major, None);
    }

    #[test]
    fn test_unparseable_matching_line_is_skipped() {
        let registry = "gsmtty driver header\nabc gsmtty\n251 gsmtty\n";
        let major = find_major(Cursor::new(registry), "gsmtty").unwrap();
        assert_eq!(major, Some(251));
    }

    #[test]
    fn test_non_utf8_lines_are_skipped() {
        let mut registry = b"Character devices:\n  9 st\xff\xfe\n".to_vec();
        registry.extend_from_slice(b"247 gsmtty\n");
        let major = find_major(Cursor::new(registry), "gsmtty").unwrap();
        assert_eq!(major, Some(247));
    }

    #[test]
    fn test_discover_major_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices");
        std::fs::write(&path, REGISTRY).unwrap();

        assert_eq!(discover_major(&path, "gsmtty").unwrap(), 247);

        let err = discover_major(&path, "nope").unwrap_err();
        assert!(matches!(err, LinkError::MajorNotFound { ref driver } if driver == "nope"));
    }

    #[test]
    fn test_discover_major_missing_registry() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_major(&dir.path().join("devices"), "gsmtty").unwrap_err();
        assert!(matches!(err, LinkError::Registry { .. }));
    }

    #[test]
    fn test_layout_paths() {
        let layout = NodeLayout::new("/dev/ttyGSM", 3);
        let nodes: Vec<_> = layout.nodes().collect();
        assert_eq!(
            nodes,
            vec![
                (1, PathBuf::from("/dev/ttyGSM1")),
                (2, PathBuf::from("/dev/ttyGSM2")),
                (3, PathBuf::from("/dev/ttyGSM3")),
            ]
        );
        assert_eq!(NodeLayout::new("/dev/ttyGSM", 0).nodes().count(), 0);
    }

    #[test]
    fn test_mknod_without_privilege_or_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("ttyGSM1");
        assert!(CharDeviceBackend.create_char_node(&path, 247, 1).is_err());
    }

    proptest! {
        #[test]
        fn registry_lookup_finds_first_matching_entry(
            majors in prop::collection::vec(1u32..512, 1..8),
            target in 0usize..8
        ) {
            let target = target % majors.len();
            let registry: String = majors
                .iter()
                .enumerate()
                .map(|(idx, major)| {
                    let name = if idx >= target { "gsmtty" } else { "other" };
                    format!("{:>3} {}\n", major, name)
                })
                .collect();

            let found = find_major(Cursor::new(registry), "gsmtty").unwrap();
            prop_assert_eq!(found, Some(majors[target]));
        }
    }
}

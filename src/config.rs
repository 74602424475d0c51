use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Bytes reported by `FRE` in a fresh session.
pub const DEFAULT_FREE_MEMORY: u32 = 60300;

/// Highest file number `OPEN` accepts unless configured otherwise.
pub const DEFAULT_MAX_FILES: usize = 3;

/// ## Session configuration
///
/// Everything here travels inside a snapshot so a resumed session sees the
/// same drives, limits and random sequence.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Drive letter to host directory.
    pub mount: BTreeMap<char, PathBuf>,
    /// Drive used for file names without a `X:` prefix.
    pub current_drive: char,
    pub max_files: usize,
    /// Initial value of the `FRE` counter.
    pub memory: u32,
    /// Seed for `RND`.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            mount: BTreeMap::new(),
            current_drive: 'Z',
            max_files: DEFAULT_MAX_FILES,
            memory: DEFAULT_FREE_MEMORY,
            seed: 0,
        }
    }
}

impl Config {
    pub fn mount<P: Into<PathBuf>>(mut self, drive: char, path: P) -> Config {
        self.mount.insert(drive.to_ascii_uppercase(), path.into());
        self
    }
}

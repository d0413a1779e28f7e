//! Directory expansion: turn a traversal root into the set of regular files
//! beneath it.
//!
//! Iterative depth-first walk with an explicit stack, so deep trees cannot
//! exhaust the thread stack. Symlinks are skipped unless `follow_symlinks` is
//! set; when it is, a `(device, inode)` visited set breaks cycles. Directories
//! on a different filesystem than the root are skipped unless `cross_devices`.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ShredError};

/// Traversal policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    pub follow_symlinks: bool,
    pub cross_devices: bool,
}

/// Why a directory was not descended into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `read_dir` failed (permissions, vanished mid-walk).
    Unreadable(String),
    /// Mount point onto another filesystem.
    OtherDevice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDir {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Files discovered under a root.
#[derive(Debug, Clone, Default)]
pub struct WalkResult {
    /// Regular files only, in discovery order.
    pub files: Vec<PathBuf>,
    /// Directories successfully listed, root included.
    pub directories_visited: usize,
    pub skipped: Vec<SkippedDir>,
}

/// Identity of a directory for cycle detection.
type DirKey = (u64, u64);

pub struct DirectoryWalker {
    config: WalkerConfig,
}

impl DirectoryWalker {
    pub const fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Walk `root` and return every reachable regular file.
    ///
    /// Fails only when the root itself is missing, unreadable as metadata, or
    /// not a directory. Unreadable subdirectories land in `skipped`.
    pub fn walk(&self, root: &Path) -> Result<WalkResult> {
        let root_meta = metadata_for_path(root, self.config.follow_symlinks)
            .map_err(|source| ShredError::io(root, source))?;
        if !root_meta.is_dir() {
            return Err(ShredError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        let root_dev = device_id(&root_meta);

        let mut result = WalkResult::default();
        let mut visited: HashSet<DirKey> = HashSet::new();
        if self.config.follow_symlinks {
            visited.insert(dir_key(&root_meta));
        }

        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    result.skipped.push(SkippedDir {
                        path: dir,
                        reason: SkipReason::Unreadable(err.to_string()),
                    });
                    continue;
                }
            };
            result.directories_visited += 1;

            for entry_result in entries {
                let Ok(entry) = entry_result else {
                    continue;
                };
                let Ok(ft) = entry.file_type() else {
                    continue;
                };
                let child = entry.path();

                if ft.is_symlink() {
                    if !self.config.follow_symlinks {
                        continue;
                    }
                    // Only directories are followed; a symlinked file would be
                    // rejected by the overwriter, so it is never reported.
                    match fs::metadata(&child) {
                        Ok(meta) if meta.is_dir() => {
                            self.push_dir(child, &meta, root_dev, &mut visited, &mut stack, &mut result);
                        }
                        _ => {}
                    }
                    continue;
                }

                if ft.is_dir() {
                    let Ok(meta) = fs::symlink_metadata(&child) else {
                        continue;
                    };
                    self.push_dir(child, &meta, root_dev, &mut visited, &mut stack, &mut result);
                } else if ft.is_file() {
                    result.files.push(child);
                }
            }
        }

        Ok(result)
    }

    fn push_dir(
        &self,
        path: PathBuf,
        meta: &fs::Metadata,
        root_dev: u64,
        visited: &mut HashSet<DirKey>,
        stack: &mut Vec<PathBuf>,
        result: &mut WalkResult,
    ) {
        if !self.config.cross_devices && device_id(meta) != root_dev {
            result.skipped.push(SkippedDir {
                path,
                reason: SkipReason::OtherDevice,
            });
            return;
        }
        if self.config.follow_symlinks && !visited.insert(dir_key(meta)) {
            return;
        }
        stack.push(path);
    }
}

/// Walk `root` with the default policy (no symlinks, single filesystem).
pub fn walk(root: &Path) -> Result<WalkResult> {
    DirectoryWalker::new(WalkerConfig::default()).walk(root)
}

fn metadata_for_path(path: &Path, follow_symlinks: bool) -> std::io::Result<fs::Metadata> {
    if follow_symlinks {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    }
}

pub(crate) fn device_id(meta: &fs::Metadata) -> u64 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        meta.dev()
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        0
    }
}

fn dir_key(meta: &fs::Metadata) -> DirKey {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        (meta.dev(), meta.ino())
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        (0, 0)
    }
}

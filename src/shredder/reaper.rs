//! Folder teardown after a directory shred.
//!
//! Removes the directory tree under a folder children-first, never removing
//! the traversal root. Best effort: a directory that cannot be removed (still
//! holds a failed file, permissions) is recorded and skipped, and its parents
//! then fail as non-empty and are recorded too.
//!
//! Teardown stays on the root's filesystem unless told otherwise, matching
//! the walker: a mount point below the root is recorded, never entered.

#![allow(missing_docs)]

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::shredder::walker::device_id;

/// Why a directory was left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapFailureKind {
    /// Could not be listed.
    Unreadable,
    /// Still holds entries (a surviving file, or a child that was kept).
    NotEmpty,
    /// Lives on another filesystem than the root.
    OtherDevice,
    /// `rmdir` failed for any other reason.
    Io,
}

impl ReapFailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unreadable => "unreadable",
            Self::NotEmpty => "not_empty",
            Self::OtherDevice => "other_device",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ReapFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directory that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapFailure {
    pub path: PathBuf,
    pub kind: ReapFailureKind,
    pub reason: String,
}

/// What a reap removed and what it left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Removed directories, children before parents.
    pub removed: Vec<PathBuf>,
    pub failures: Vec<ReapFailure>,
}

impl ReapReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: PathBuf, kind: ReapFailureKind, reason: impl Into<String>) {
        self.failures.push(ReapFailure {
            path,
            kind,
            reason: reason.into(),
        });
    }
}

/// Teardown policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapOptions {
    /// Descend into directories on other filesystems than the root.
    pub cross_devices: bool,
}

/// Remove `folder` and every directory beneath it, except `root`, without
/// leaving the root's filesystem.
///
/// Symlinked directories are never entered. Files are not touched: a folder
/// still holding one fails with "directory not empty" and is reported.
pub fn reap(folder: &Path, root: &Path) -> ReapReport {
    reap_with(folder, root, ReapOptions::default())
}

pub fn reap_with(folder: &Path, root: &Path, options: ReapOptions) -> ReapReport {
    if options.cross_devices {
        return reap_scoped(folder, root, None);
    }
    match fs::symlink_metadata(root) {
        Ok(meta) => reap_scoped(folder, root, Some(device_id(&meta))),
        Err(err) => {
            let mut report = ReapReport::default();
            report.fail(
                root.to_path_buf(),
                ReapFailureKind::Unreadable,
                format!("cannot stat traversal root: {err}"),
            );
            report
        }
    }
}

/// Core loop. With `device` set, directories on any other device are
/// recorded as `OtherDevice` and left alone.
fn reap_scoped(folder: &Path, root: &Path, device: Option<u64>) -> ReapReport {
    let mut report = ReapReport::default();

    if let Some(dev) = device {
        if folder != root {
            if let Ok(meta) = fs::symlink_metadata(folder) {
                if device_id(&meta) != dev {
                    report.fail(
                        folder.to_path_buf(),
                        ReapFailureKind::OtherDevice,
                        "on another filesystem",
                    );
                    return report;
                }
            }
        }
    }

    // (path, children_pushed)
    let mut stack: Vec<(PathBuf, bool)> = vec![(folder.to_path_buf(), false)];
    while let Some((dir, expanded)) = stack.pop() {
        if expanded {
            if dir == root {
                continue;
            }
            match fs::remove_dir(&dir) {
                Ok(()) => report.removed.push(dir),
                Err(err) => {
                    let kind = if err.kind() == ErrorKind::DirectoryNotEmpty {
                        ReapFailureKind::NotEmpty
                    } else {
                        ReapFailureKind::Io
                    };
                    report.fail(dir, kind, err.to_string());
                }
            }
            continue;
        }

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                report.fail(dir, ReapFailureKind::Unreadable, err.to_string());
                continue;
            }
        };

        stack.push((dir, true));
        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|ft| ft.is_dir()) {
                continue;
            }
            let path = entry.path();
            if let Some(dev) = device {
                // DirEntry::metadata does not traverse symlinks.
                match entry.metadata() {
                    Ok(meta) if device_id(&meta) == dev => {}
                    Ok(_) => {
                        report.fail(path, ReapFailureKind::OtherDevice, "on another filesystem");
                        continue;
                    }
                    Err(err) => {
                        report.fail(path, ReapFailureKind::Unreadable, err.to_string());
                        continue;
                    }
                }
            }
            stack.push((path, false));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_nested_tree_but_keeps_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("d")).unwrap();

        let report = reap(root, root);

        assert!(root.exists());
        assert!(!root.join("a").exists());
        assert!(!root.join("d").exists());
        assert_eq!(report.removed.len(), 4);
        assert!(report.is_complete());
    }

    #[test]
    fn children_removed_before_parents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("p/q")).unwrap();

        let report = reap(root, root);
        let q = report.removed.iter().position(|p| p == &root.join("p/q"));
        let p = report.removed.iter().position(|p| p == &root.join("p"));
        assert!(q.unwrap() < p.unwrap());
    }

    #[test]
    fn reap_of_root_alone_never_deletes_root() {
        let dir = tempfile::tempdir().unwrap();
        let report = reap(dir.path(), dir.path());
        assert!(dir.path().exists());
        assert!(report.removed.is_empty());
        assert!(report.is_complete());
    }

    #[test]
    fn subfolder_is_removed_when_not_root() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(sub.join("inner")).unwrap();
        let report = reap(&sub, dir.path());
        assert!(!sub.exists());
        assert_eq!(report.removed.len(), 2);
    }

    #[test]
    fn non_empty_directories_are_skipped_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("keep/inner")).unwrap();
        fs::create_dir_all(root.join("clean")).unwrap();
        fs::write(root.join("keep/inner/survivor.bin"), b"x").unwrap();

        let report = reap(root, root);

        assert!(!root.join("clean").exists());
        assert!(root.join("keep/inner/survivor.bin").exists());
        let failed: Vec<&PathBuf> = report.failures.iter().map(|f| &f.path).collect();
        assert!(failed.contains(&&root.join("keep/inner")));
        assert!(failed.contains(&&root.join("keep")));
        assert!(
            report
                .failures
                .iter()
                .all(|f| f.kind == ReapFailureKind::NotEmpty)
        );
    }

    #[test]
    fn directories_on_another_device_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("mnt/foreign/nested")).unwrap();
        let root_dev = device_id(&fs::symlink_metadata(root).unwrap());

        // Pretend the root lives on a different device than its children,
        // which is how a mount point below the root looks.
        let report = reap_scoped(root, root, Some(root_dev.wrapping_add(1)));

        assert!(root.join("mnt/foreign/nested").is_dir());
        assert!(report.removed.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, root.join("mnt"));
        assert_eq!(report.failures[0].kind, ReapFailureKind::OtherDevice);
    }

    #[test]
    fn same_device_scope_still_removes_local_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        let root_dev = device_id(&fs::symlink_metadata(root).unwrap());

        let report = reap_scoped(root, root, Some(root_dev));
        assert_eq!(report.removed.len(), 2);
        assert!(report.is_complete());
    }

    #[test]
    fn cross_device_option_skips_scoping() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x")).unwrap();
        let report = reap_with(
            dir.path(),
            dir.path(),
            ReapOptions {
                cross_devices: true,
            },
        );
        assert_eq!(report.removed, vec![dir.path().join("x")]);
    }

    #[test]
    fn missing_root_is_reported_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");
        let report = reap(&gone, &gone);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, ReapFailureKind::Unreadable);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_child_is_tagged_apart_from_non_empty_parent() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let locked = root.join("outer/locked");
        fs::create_dir_all(locked.join("inner")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let report = reap(root, root);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Root bypasses permission bits; only assert when the lock took effect.
        if locked.join("inner").exists() {
            let kind_of = |p: &Path| {
                report
                    .failures
                    .iter()
                    .find(|f| f.path == p)
                    .map(|f| f.kind)
            };
            assert_eq!(kind_of(locked.as_path()), Some(ReapFailureKind::Unreadable));
            assert_eq!(kind_of(root.join("outer").as_path()), Some(ReapFailureKind::NotEmpty));
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_entered() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::create_dir_all(outside.path().join("must_survive")).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let _ = reap(dir.path(), dir.path());

        assert!(outside.path().join("must_survive").exists());
    }

    #[test]
    fn missing_folder_is_reported_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let report = reap(&dir.path().join("gone"), dir.path());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, ReapFailureKind::Unreadable);
    }
}

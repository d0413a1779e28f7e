//! Shared path utilities: absolute resolution for CLI targets and digest
//! redaction for activity logs.

use std::env;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

/// Resolve a path to an absolute, normalized path.
///
/// The parent directory is canonicalized when it exists; the final component
/// is kept as given so a symlinked target is never replaced by whatever it
/// points at. Otherwise the path is joined onto CWD and `.`/`..` are resolved
/// syntactically, which keeps a vanished target reportable under a stable name.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let normalized = normalize_syntactic(&absolute);

    match (normalized.parent(), normalized.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .map_or_else(|_| normalized.clone(), |parent| parent.join(name)),
        _ => normalized,
    }
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

/// Render a path for the activity log.
///
/// With `redact` set the path is replaced by `sha256:<16 hex>`, stable for the
/// same input so entries can still be correlated.
pub fn display_for_log(path: &Path, redact: bool) -> String {
    if redact {
        redact_path(path)
    } else {
        path.display().to_string()
    }
}

/// Truncated SHA-256 digest of the path bytes.
pub fn redact_path(path: &Path) -> String {
    let digest = Sha256::digest(path.as_os_str().as_encoded_bytes());
    let mut out = String::with_capacity(7 + 16);
    out.push_str("sha256:");
    for byte in &digest[..8] {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

//! FSH-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, ShredError>;

/// Top-level error type for the shredding engine.
#[derive(Debug, Error)]
pub enum ShredError {
    #[error("[FSH-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FSH-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FSH-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FSH-2001] not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("[FSH-2002] not a regular file: {path}")]
    NotRegularFile { path: PathBuf },

    #[error("[FSH-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FSH-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[FSH-3001] permission denied for {path}")]
    PermissionDenied { path: PathBuf },

    #[error("[FSH-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FSH-3004] not found: {path}")]
    NotFound { path: PathBuf },

    #[error("[FSH-3100] cancelled before processing {path}")]
    Cancelled { path: PathBuf },

    #[error("[FSH-3900] runtime failure: {details}")]
    Runtime { details: String },
}

/// Coarse failure taxonomy reported to callers alongside each failed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Target vanished before or during processing.
    NotFound,
    PermissionDenied,
    /// Seek, write, read, rename, or delete failure.
    Io,
    /// Ambiguous or invalid configuration.
    Configuration,
    /// Cancellation observed before the target was touched.
    Cancelled,
}

impl ShredError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FSH-1001",
            Self::MissingConfig { .. } => "FSH-1002",
            Self::ConfigParse { .. } => "FSH-1003",
            Self::NotADirectory { .. } => "FSH-2001",
            Self::NotRegularFile { .. } => "FSH-2002",
            Self::Serialization { .. } => "FSH-2101",
            Self::Sql { .. } => "FSH-2102",
            Self::PermissionDenied { .. } => "FSH-3001",
            Self::Io { .. } => "FSH-3002",
            Self::NotFound { .. } => "FSH-3004",
            Self::Cancelled { .. } => "FSH-3100",
            Self::Runtime { .. } => "FSH-3900",
        }
    }

    /// Map onto the caller-facing failure taxonomy.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::PermissionDenied { .. } => FailureKind::PermissionDenied,
            Self::InvalidConfig { .. } | Self::MissingConfig { .. } | Self::ConfigParse { .. } => {
                FailureKind::Configuration
            }
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::NotADirectory { .. }
            | Self::NotRegularFile { .. }
            | Self::Serialization { .. }
            | Self::Sql { .. }
            | Self::Io { .. }
            | Self::Runtime { .. } => FailureKind::Io,
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Sql { .. } | Self::Cancelled { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    ///
    /// `NotFound` and `PermissionDenied` kinds are lifted into their dedicated
    /// variants so callers can report them distinctly.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            ErrorKind::NotFound => Self::NotFound { path },
            ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for ShredError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for ShredError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShredError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

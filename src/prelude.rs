//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use file_shredder::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{FailureKind, Result, ShredError};
pub use crate::core::signals::CancellationToken;

// Logging
pub use crate::logger::dual::{ActivityLoggerHandle, DualLoggerConfig, spawn_logger};

// Shredder
pub use crate::shredder::pattern::FillMode;
pub use crate::shredder::reaper::ReapReport;
pub use crate::shredder::session::{
    SessionState, ShredConfig, ShredOutcome, ShredReport, ShredSession, shred_directory,
    shred_directory_with, shred_files, shred_files_with,
};
pub use crate::shredder::walker::{DirectoryWalker, WalkerConfig};

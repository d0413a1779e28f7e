//! Shredding engine: pattern overwrite, rename obfuscation, unlink, directory
//! expansion and folder teardown.

pub mod obfuscate;
pub mod overwrite;
pub mod pattern;
pub mod reaper;
pub mod session;
pub mod walker;

pub use session::{
    ShredConfig, ShredOutcome, ShredReport, ShredSession, shred_directory, shred_directory_with,
    shred_files, shred_files_with,
};

#![forbid(unsafe_code)]

//! file_shredder (fshred): destroy files so their contents and names are hard
//! to recover.
//!
//! Each target is overwritten in place with a fill pattern, renamed to random
//! names repeatedly, then unlinked. Directory mode walks a tree, shreds every
//! regular file, and optionally removes the emptied subfolders while keeping
//! the root.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use file_shredder::prelude::*;
//!
//! let config = ShredConfig {
//!     fill_mode: Some(FillMode::Zero),
//!     ..ShredConfig::default()
//! };
//! let report = shred_files(&["/tmp/secret.txt".into()], &config)?;
//! for outcome in &report.outcomes {
//!     println!("{}: {}", outcome.path().display(), outcome.is_success());
//! }
//! # Ok::<(), file_shredder::core::errors::ShredError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod shredder;

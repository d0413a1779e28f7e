//! Rename obfuscation: walk a file through a chain of random sibling names so
//! the directory entry no longer reveals what was shredded.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::CryptoRng;

use crate::core::errors::{Result, ShredError};

/// Default number of rename passes.
pub const DEFAULT_RENAME_PASSES: u32 = 25;

/// Attempts to find an unused sibling name before giving up on a pass.
const MAX_NAME_ATTEMPTS: u32 = 16;

/// Tracks a file as it moves through successive random names.
///
/// Keeping the current location on the struct lets a caller report where a
/// file was left when a rename in the middle of the chain fails.
#[derive(Debug, Clone)]
pub struct PathObfuscator {
    current: PathBuf,
    renames: u32,
}

impl PathObfuscator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            current: path.into(),
            renames: 0,
        }
    }

    /// Where the file lives now.
    pub fn current(&self) -> &Path {
        &self.current
    }

    /// Renames completed so far.
    pub const fn renames(&self) -> u32 {
        self.renames
    }

    /// Rename once to a fresh random sibling name.
    pub fn rename_once<R: CryptoRng + ?Sized>(&mut self, rng: &mut R) -> Result<&Path> {
        let next = fresh_sibling(&self.current, rng)?;
        fs::rename(&self.current, &next).map_err(|source| ShredError::io(&self.current, source))?;
        self.current = next;
        self.renames += 1;
        Ok(&self.current)
    }

    /// Run `passes` renames, stopping at the first failure.
    pub fn run<R: CryptoRng + ?Sized>(&mut self, passes: u32, rng: &mut R) -> Result<&Path> {
        for _ in 0..passes {
            self.rename_once(rng)?;
        }
        Ok(&self.current)
    }

    pub fn into_path(self) -> PathBuf {
        self.current
    }
}

/// Rename `path` `passes` times and return the final location.
///
/// `passes == 0` returns the input unchanged without touching the filesystem.
pub fn obfuscate<R: CryptoRng + ?Sized>(path: &Path, passes: u32, rng: &mut R) -> Result<PathBuf> {
    let mut obfuscator = PathObfuscator::new(path);
    obfuscator.run(passes, rng)?;
    Ok(obfuscator.into_path())
}

/// Hyphenated version-4 UUID built from 128 bits of `rng` output.
pub fn random_name<R: CryptoRng + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

fn fresh_sibling<R: CryptoRng + ?Sized>(path: &Path, rng: &mut R) -> Result<PathBuf> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    for _ in 0..MAX_NAME_ATTEMPTS {
        let candidate = parent.join(random_name(rng));
        match fs::symlink_metadata(&candidate) {
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(candidate),
            Ok(_) => {}
            Err(err) => return Err(ShredError::io(&candidate, err)),
        }
    }
    Err(ShredError::Runtime {
        details: format!(
            "no unused name found next to {} after {MAX_NAME_ATTEMPTS} attempts",
            path.display()
        ),
    })
}

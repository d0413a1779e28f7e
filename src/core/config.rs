//! Configuration: TOML file, then `FSHRED_*` environment overrides, then
//! validation.

#![allow(missing_docs)]

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ShredError};
use crate::logger::dual::DualLoggerConfig;
use crate::logger::jsonl::{JsonlConfig, default_data_dir};
use crate::shredder::obfuscate::DEFAULT_RENAME_PASSES;
use crate::shredder::overwrite::DEFAULT_CHUNK_SIZE;
use crate::shredder::pattern::FillMode;
use crate::shredder::session::{MAX_PARALLELISM, ShredConfig};
use crate::shredder::walker::WalkerConfig;

/// Smallest accepted write chunk.
pub const MIN_CHUNK_SIZE: usize = 512;
/// Largest accepted write chunk (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
/// Upper bound on rename passes per file.
pub const MAX_RENAME_PASSES: u32 = 1000;

/// Full fshred configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub shred: ShredSection,
    pub walker: WalkerConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// How each file is destroyed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShredSection {
    pub fill_mode: FillMode,
    pub rename_passes: u32,
    pub rename_enabled: bool,
    pub delete_container_folder: bool,
    pub chunk_size: usize,
    pub sync_writes: bool,
    pub parallelism: usize,
}

/// Activity log behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Log `sha256:` digests instead of target paths.
    pub redact_paths: bool,
    pub sqlite_enabled: bool,
    pub jsonl_max_size_bytes: u64,
    pub jsonl_max_rotated_files: u32,
}

/// Filesystem paths used by fshred.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
    pub jsonl_fallback: Option<PathBuf>,
    pub sqlite_db: PathBuf,
}

impl Default for ShredSection {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Random,
            rename_passes: DEFAULT_RENAME_PASSES,
            rename_enabled: true,
            delete_container_folder: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sync_writes: true,
            parallelism: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_paths: true,
            sqlite_enabled: true,
            jsonl_max_size_bytes: 16 * 1024 * 1024,
            jsonl_max_rotated_files: 3,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let config_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[FSH-CONFIG] WARNING: HOME not set, falling back to /tmp for config path");
                PathBuf::from("/tmp").join("fshred")
            },
            |home| PathBuf::from(home).join(".config").join("fshred"),
        );
        let data = default_data_dir();
        Self {
            config_file: config_dir.join("config.toml"),
            jsonl_log: data.join("activity.jsonl"),
            jsonl_fallback: Some(PathBuf::from("/dev/shm/fshred.jsonl")),
            sqlite_db: data.join("activity.sqlite3"),
        }
    }
}

impl Config {
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load from the default or an explicit path, apply env overrides, validate.
    ///
    /// A missing file at the default path means defaults; a missing explicit
    /// path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw =
                fs::read_to_string(&path_buf).map_err(|source| ShredError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(ShredError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// FNV-1a over the canonical JSON form; stable across processes and
    /// toolchains, unlike `DefaultHasher`.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Engine settings for one session.
    pub fn shred_config(&self) -> ShredConfig {
        ShredConfig {
            fill_mode: Some(self.shred.fill_mode),
            rename_passes: self.shred.rename_passes,
            rename_enabled: self.shred.rename_enabled,
            delete_container_folder: self.shred.delete_container_folder,
            chunk_size: self.shred.chunk_size,
            sync_writes: self.shred.sync_writes,
            parallelism: self.shred.parallelism,
            walker: self.walker.clone(),
        }
    }

    /// Activity logger settings; `None` when logging is disabled.
    pub fn logger_config(&self) -> Option<DualLoggerConfig> {
        if !self.logging.enabled {
            return None;
        }
        Some(DualLoggerConfig {
            sqlite_path: self
                .logging
                .sqlite_enabled
                .then(|| self.paths.sqlite_db.clone()),
            jsonl_config: JsonlConfig {
                path: self.paths.jsonl_log.clone(),
                fallback_path: self.paths.jsonl_fallback.clone(),
                max_size_bytes: self.logging.jsonl_max_size_bytes,
                max_rotated_files: self.logging.jsonl_max_rotated_files,
                ..JsonlConfig::default()
            },
            redact_paths: self.logging.redact_paths,
            ..DualLoggerConfig::default()
        })
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let shred = &mut self.shred;
        set_from(&mut lookup, "FSHRED_SHRED_FILL_MODE", &mut shred.fill_mode)?;
        set_from(&mut lookup, "FSHRED_SHRED_RENAME_PASSES", &mut shred.rename_passes)?;
        set_from(&mut lookup, "FSHRED_SHRED_RENAME_ENABLED", &mut shred.rename_enabled)?;
        set_from(
            &mut lookup,
            "FSHRED_SHRED_DELETE_CONTAINER_FOLDER",
            &mut shred.delete_container_folder,
        )?;
        set_from(&mut lookup, "FSHRED_SHRED_CHUNK_SIZE", &mut shred.chunk_size)?;
        set_from(&mut lookup, "FSHRED_SHRED_SYNC_WRITES", &mut shred.sync_writes)?;
        set_from(&mut lookup, "FSHRED_SHRED_PARALLELISM", &mut shred.parallelism)?;

        set_from(
            &mut lookup,
            "FSHRED_WALKER_FOLLOW_SYMLINKS",
            &mut self.walker.follow_symlinks,
        )?;
        set_from(
            &mut lookup,
            "FSHRED_WALKER_CROSS_DEVICES",
            &mut self.walker.cross_devices,
        )?;

        set_from(&mut lookup, "FSHRED_LOGGING_ENABLED", &mut self.logging.enabled)?;
        set_from(
            &mut lookup,
            "FSHRED_LOGGING_REDACT_PATHS",
            &mut self.logging.redact_paths,
        )?;

        if let Some(raw) = lookup("FSHRED_PATHS_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("FSHRED_PATHS_SQLITE_DB") {
            self.paths.sqlite_db = PathBuf::from(raw);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let shred = &self.shred;
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&shred.chunk_size) {
            return Err(ShredError::InvalidConfig {
                details: format!(
                    "shred.chunk_size must be in [{MIN_CHUNK_SIZE}, {MAX_CHUNK_SIZE}], got {}",
                    shred.chunk_size
                ),
            });
        }
        if shred.parallelism == 0 || shred.parallelism > MAX_PARALLELISM {
            return Err(ShredError::InvalidConfig {
                details: format!(
                    "shred.parallelism must be in [1, {MAX_PARALLELISM}], got {}",
                    shred.parallelism
                ),
            });
        }
        if shred.rename_passes > MAX_RENAME_PASSES {
            return Err(ShredError::InvalidConfig {
                details: format!(
                    "shred.rename_passes must be <= {MAX_RENAME_PASSES}, got {}",
                    shred.rename_passes
                ),
            });
        }
        if self.logging.jsonl_max_size_bytes == 0 {
            return Err(ShredError::InvalidConfig {
                details: "logging.jsonl_max_size_bytes must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_from<F, T>(lookup: &mut F, name: &str, slot: &mut T) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.trim().parse::<T>().map_err(|error| ShredError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Config, ShredError};
    use crate::shredder::pattern::FillMode;
    use std::collections::HashMap;
    use std::path::Path;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn defaults_map_onto_engine_config() {
        let shred = Config::default().shred_config();
        assert_eq!(shred.fill_mode, Some(FillMode::Random));
        assert_eq!(shred.rename_passes, 25);
        assert!(shred.rename_enabled);
        assert!(shred.delete_container_folder);
        assert!(!shred.walker.follow_symlinks);
        assert!(shred.validate().is_ok());
    }

    #[test]
    fn toml_sections_parse() {
        let raw = r#"
            [shred]
            fill_mode = "zero"
            rename_passes = 3
            parallelism = 4

            [walker]
            follow_symlinks = true

            [logging]
            redact_paths = false
        "#;
        let cfg: Config = toml::from_str(raw).unwrap();
        assert_eq!(cfg.shred.fill_mode, FillMode::Zero);
        assert_eq!(cfg.shred.rename_passes, 3);
        assert_eq!(cfg.shred.parallelism, 4);
        assert_eq!(cfg.shred.chunk_size, 4096);
        assert!(cfg.walker.follow_symlinks);
        assert!(!cfg.logging.redact_paths);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_fill_mode_in_toml_is_parse_error() {
        let err = toml::from_str::<Config>("[shred]\nfill_mode = \"plaid\"\n").unwrap_err();
        let err: ShredError = err.into();
        assert_eq!(err.code(), "FSH-1003");
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        let overrides = vars(&[
            ("FSHRED_SHRED_FILL_MODE", "max"),
            ("FSHRED_SHRED_RENAME_ENABLED", "false"),
            ("FSHRED_SHRED_PARALLELISM", "8"),
            ("FSHRED_WALKER_CROSS_DEVICES", "true"),
            ("FSHRED_LOGGING_REDACT_PATHS", "false"),
            ("FSHRED_PATHS_JSONL_LOG", "/tmp/fshred-test/a.jsonl"),
        ]);
        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("overrides should parse");

        assert_eq!(cfg.shred.fill_mode, FillMode::Max);
        assert!(!cfg.shred.rename_enabled);
        assert_eq!(cfg.shred.parallelism, 8);
        assert!(cfg.walker.cross_devices);
        assert!(!cfg.logging.redact_paths);
        assert_eq!(
            cfg.paths.jsonl_log,
            std::path::PathBuf::from("/tmp/fshred-test/a.jsonl")
        );
    }

    #[test]
    fn env_invalid_boolean_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("FSHRED_SHRED_SYNC_WRITES", "yes-please")]);
        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("invalid bool should fail");
        match err {
            ShredError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("FSHRED_SHRED_SYNC_WRITES"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_invalid_fill_mode_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("FSHRED_SHRED_FILL_MODE", "sometimes")]);
        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .unwrap_err();
        assert!(err.to_string().contains("FSHRED_SHRED_FILL_MODE"));
    }

    #[test]
    fn chunk_size_bounds_enforced() {
        let mut cfg = Config::default();
        cfg.shred.chunk_size = 100;
        assert!(cfg.validate().unwrap_err().to_string().contains("chunk_size"));
        cfg.shred.chunk_size = 32 * 1024 * 1024;
        assert!(cfg.validate().is_err());
        cfg.shred.chunk_size = 512;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parallelism_bounds_enforced() {
        let mut cfg = Config::default();
        cfg.shred.parallelism = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("parallelism"));
        cfg.shred.parallelism = 65;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rename_passes_capped() {
        let mut cfg = Config::default();
        cfg.shred.rename_passes = 5_000;
        assert!(cfg.validate().unwrap_err().to_string().contains("rename_passes"));
    }

    #[test]
    fn logger_config_respects_switches() {
        let mut cfg = Config::default();
        let logger = cfg.logger_config().expect("enabled by default");
        assert!(logger.redact_paths);
        assert!(logger.sqlite_path.is_some());

        cfg.logging.sqlite_enabled = false;
        assert!(cfg.logger_config().unwrap().sqlite_path.is_none());

        cfg.logging.enabled = false;
        assert!(cfg.logger_config().is_none());
    }

    #[test]
    fn stable_hash_changes_when_config_changes() {
        let cfg = Config::default();
        let mut modified = Config::default();
        modified.shred.rename_passes += 1;
        assert_ne!(cfg.stable_hash().unwrap(), modified.stable_hash().unwrap());
        assert_eq!(cfg.stable_hash().unwrap(), cfg.stable_hash().unwrap());
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let err = Config::load(Some(Path::new("/nonexistent/fshred/config.toml"))).unwrap_err();
        assert!(matches!(err, ShredError::MissingConfig { .. }));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[shred]\nfill_mode = \"max\"\nrename_passes = 2\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.paths.config_file, path);
        assert_eq!(cfg.shred.rename_passes, 2);
    }

    #[test]
    fn load_rejects_invalid_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[shred]\nchunk_size = 1\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ShredError::InvalidConfig { .. }));
    }
}

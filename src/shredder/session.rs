//! Shred session: collect targets, confirm, shred each one, tear down folders.
//!
//! State machine:
//!
//! ```text
//! Idle ──add/collect──▶ Collecting ──confirm──▶ Confirmed ──run──▶ Shredding ──▶ Completed
//!   └──────────────────────┴──────────abort─────────┴──▶ Aborted
//! ```
//!
//! Nothing on disk changes before `run`. Once shredding starts the batch
//! runs to the end; the only early stop is the cancellation token, polled
//! before each file. Every target yields exactly one outcome, in submission
//! order.

#![allow(missing_docs)]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as channel;
use parking_lot::Mutex;
use rand::CryptoRng;

use crate::core::errors::{FailureKind, Result, ShredError};
use crate::core::signals::CancellationToken;
use crate::logger::dual::{ActivityEvent, ActivityLoggerHandle};
use crate::shredder::obfuscate::{DEFAULT_RENAME_PASSES, PathObfuscator};
use crate::shredder::overwrite::{self, DEFAULT_CHUNK_SIZE, OverwriteOptions};
use crate::shredder::pattern::FillMode;
use crate::shredder::reaper::{self, ReapOptions, ReapReport};
use crate::shredder::walker::{DirectoryWalker, SkippedDir, WalkerConfig};

/// Upper bound on worker threads.
pub const MAX_PARALLELISM: usize = 64;

/// Immutable settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShredConfig {
    /// Exactly one pattern must be chosen; `None` is a configuration error.
    pub fill_mode: Option<FillMode>,
    pub rename_passes: u32,
    pub rename_enabled: bool,
    /// Remove emptied subfolders after a directory shred.
    pub delete_container_folder: bool,
    pub chunk_size: usize,
    pub sync_writes: bool,
    pub parallelism: usize,
    pub walker: WalkerConfig,
}

impl Default for ShredConfig {
    fn default() -> Self {
        Self {
            fill_mode: Some(FillMode::Random),
            rename_passes: DEFAULT_RENAME_PASSES,
            rename_enabled: true,
            delete_container_folder: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sync_writes: true,
            parallelism: 1,
            walker: WalkerConfig::default(),
        }
    }
}

impl ShredConfig {
    /// Check the config and resolve the fill mode.
    pub fn validate(&self) -> Result<FillMode> {
        let Some(mode) = self.fill_mode else {
            return Err(ShredError::InvalidConfig {
                details: "no fill mode selected; choose zero, max, or random".to_string(),
            });
        };
        if self.chunk_size == 0 {
            return Err(ShredError::InvalidConfig {
                details: "chunk_size must be > 0".to_string(),
            });
        }
        if self.parallelism == 0 || self.parallelism > MAX_PARALLELISM {
            return Err(ShredError::InvalidConfig {
                details: format!(
                    "parallelism must be in 1..={MAX_PARALLELISM}, got {}",
                    self.parallelism
                ),
            });
        }
        Ok(mode)
    }

    /// Renames actually performed per file.
    pub const fn effective_rename_passes(&self) -> u32 {
        if self.rename_enabled {
            self.rename_passes
        } else {
            0
        }
    }

    pub const fn overwrite_options(&self) -> OverwriteOptions {
        OverwriteOptions {
            chunk_size: self.chunk_size,
            sync_writes: self.sync_writes,
        }
    }
}

/// Result for one submitted target.
#[derive(Debug)]
pub enum ShredOutcome {
    Success {
        path: PathBuf,
        bytes_overwritten: u64,
    },
    Failed {
        /// The path as submitted.
        path: PathBuf,
        reason: ShredError,
        /// Where the file still lives, if it survived; may differ from
        /// `path` after partial renaming.
        residual_path: Option<PathBuf>,
    },
}

impl ShredOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Success { path, .. } | Self::Failed { path, .. } => path,
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub const fn error(&self) -> Option<&ShredError> {
        match self {
            Self::Success { .. } => None,
            Self::Failed { reason, .. } => Some(reason),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error().map(ShredError::kind)
    }

    fn cancelled(path: PathBuf) -> Self {
        Self::Failed {
            reason: ShredError::Cancelled { path: path.clone() },
            residual_path: Some(path.clone()),
            path,
        }
    }
}

/// Everything a session did.
#[derive(Debug)]
pub struct ShredReport {
    /// One per target, in submission order.
    pub outcomes: Vec<ShredOutcome>,
    /// Present when folder teardown ran.
    pub folder_cleanup: Option<ReapReport>,
    /// Directories the walker could not enter.
    pub skipped_directories: Vec<SkippedDir>,
    pub cancelled: bool,
    pub duration: Duration,
}

impl ShredReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn bytes_overwritten(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o {
                ShredOutcome::Success {
                    bytes_overwritten, ..
                } => *bytes_overwritten,
                ShredOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    /// Locations of targets that are still on disk.
    pub fn pending_paths(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ShredOutcome::Failed {
                    residual_path: Some(residual),
                    ..
                } => Some(residual.as_path()),
                _ => None,
            })
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && !self.cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Collecting,
    Confirmed,
    Shredding,
    Completed,
    Aborted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Collecting => "collecting",
            Self::Confirmed => "confirmed",
            Self::Shredding => "shredding",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Per-file work order shared by every worker.
#[derive(Debug, Clone, Copy)]
struct FilePlan {
    mode: FillMode,
    rename_passes: u32,
    options: OverwriteOptions,
}

/// A single shred run over a fixed set of targets.
pub struct ShredSession {
    config: ShredConfig,
    mode: FillMode,
    state: SessionState,
    targets: Vec<PathBuf>,
    traversal_root: Option<PathBuf>,
    recursive_delete_folder: bool,
    skipped_directories: Vec<SkippedDir>,
    cancel: CancellationToken,
    logger: Option<ActivityLoggerHandle>,
}

impl ShredSession {
    /// Validate `config` and start in `Idle`.
    pub fn new(config: ShredConfig) -> Result<Self> {
        let mode = config.validate()?;
        Ok(Self {
            config,
            mode,
            state: SessionState::Idle,
            targets: Vec::new(),
            traversal_root: None,
            recursive_delete_folder: false,
            skipped_directories: Vec::new(),
            cancel: CancellationToken::new(),
            logger: None,
        })
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: ActivityLoggerHandle) -> Self {
        self.logger = Some(logger);
        self
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub fn targets(&self) -> &[PathBuf] {
        &self.targets
    }

    pub const fn config(&self) -> &ShredConfig {
        &self.config
    }

    /// Queue explicit file paths. No filesystem access happens here; missing
    /// or unsuitable targets surface as failed outcomes.
    pub fn add_files(&mut self, paths: &[PathBuf]) -> Result<()> {
        self.expect_state(&[SessionState::Idle, SessionState::Collecting], SessionState::Collecting)?;
        self.targets.extend(paths.iter().cloned());
        self.state = SessionState::Collecting;
        Ok(())
    }

    /// Expand `root` into its regular files and remember it as the traversal
    /// root for folder teardown.
    pub fn collect_directory(&mut self, root: &Path, recursive_delete_folder: bool) -> Result<usize> {
        self.expect_state(&[SessionState::Idle], SessionState::Collecting)?;
        let walk = DirectoryWalker::new(self.config.walker.clone()).walk(root)?;
        let found = walk.files.len();
        self.targets.extend(walk.files);
        self.skipped_directories = walk.skipped;
        self.traversal_root = Some(root.to_path_buf());
        self.recursive_delete_folder = recursive_delete_folder;
        self.state = SessionState::Collecting;
        Ok(found)
    }

    pub fn confirm(&mut self) -> Result<()> {
        self.expect_state(&[SessionState::Collecting], SessionState::Confirmed)?;
        self.state = SessionState::Confirmed;
        Ok(())
    }

    /// Decline before anything destructive happens.
    pub fn abort(&mut self) -> Result<()> {
        self.expect_state(
            &[
                SessionState::Idle,
                SessionState::Collecting,
                SessionState::Confirmed,
            ],
            SessionState::Aborted,
        )?;
        self.state = SessionState::Aborted;
        Ok(())
    }

    /// Shred every target, then tear down folders if requested.
    pub fn run(&mut self) -> Result<ShredReport> {
        self.expect_state(&[SessionState::Confirmed], SessionState::Shredding)?;
        self.state = SessionState::Shredding;
        let started = Instant::now();

        let plan = FilePlan {
            mode: self.mode,
            rename_passes: self.config.effective_rename_passes(),
            options: self.config.overwrite_options(),
        };
        self.log(ActivityEvent::SessionStarted {
            targets: self.targets.len(),
            fill_mode: plan.mode,
            rename_passes: plan.rename_passes,
            folder_root: self.traversal_root.clone(),
        });

        let workers = self.config.parallelism.min(self.targets.len()).max(1);
        let outcomes: Vec<ShredOutcome> = if workers == 1 {
            let mut rng = rand::rng();
            self.targets
                .iter()
                .map(|target| self.process_target(target, &plan, &mut rng))
                .collect()
        } else {
            self.run_pool(&plan, workers)
        };

        let cancelled = self.cancel.is_cancelled();
        let folder_cleanup = match &self.traversal_root {
            Some(root)
                if self.recursive_delete_folder
                    && self.config.delete_container_folder
                    && !cancelled =>
            {
                Some(self.reap_folders(root))
            }
            _ => None,
        };

        let report = ShredReport {
            outcomes,
            folder_cleanup,
            skipped_directories: std::mem::take(&mut self.skipped_directories),
            cancelled,
            duration: started.elapsed(),
        };
        self.log(ActivityEvent::SessionCompleted {
            succeeded: report.succeeded(),
            failed: report.failed(),
            bytes_overwritten: report.bytes_overwritten(),
            cancelled,
            duration_ms: duration_ms(report.duration),
        });
        self.state = SessionState::Completed;
        Ok(report)
    }

    fn expect_state(&self, allowed: &[SessionState], next: SessionState) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ShredError::Runtime {
                details: format!("invalid session transition: {} -> {next}", self.state),
            })
        }
    }

    fn log(&self, event: ActivityEvent) {
        if let Some(logger) = &self.logger {
            logger.send(event);
        }
    }

    /// Bounded worker pool. Each worker owns a thread-local CSPRNG; results
    /// land in the slot matching their submission index.
    fn run_pool(&self, plan: &FilePlan, workers: usize) -> Vec<ShredOutcome> {
        let (work_tx, work_rx) = channel::bounded::<(usize, &PathBuf)>(self.targets.len());
        for item in self.targets.iter().enumerate() {
            let _ = work_tx.send(item);
        }
        drop(work_tx);

        let slots: Vec<Mutex<Option<ShredOutcome>>> =
            self.targets.iter().map(|_| Mutex::new(None)).collect();

        thread::scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let slots = &slots;
                scope.spawn(move || {
                    let mut rng = rand::rng();
                    while let Ok((index, target)) = work_rx.recv() {
                        let outcome = self.process_target(target, plan, &mut rng);
                        *slots[index].lock() = Some(outcome);
                    }
                });
            }
        });

        slots
            .into_iter()
            .zip(&self.targets)
            .map(|(slot, target)| {
                slot.into_inner().unwrap_or_else(|| ShredOutcome::Failed {
                    path: target.clone(),
                    reason: ShredError::Runtime {
                        details: "worker exited without reporting an outcome".to_string(),
                    },
                    residual_path: fs::symlink_metadata(target).ok().map(|_| target.clone()),
                })
            })
            .collect()
    }

    fn process_target<R: CryptoRng + ?Sized>(
        &self,
        target: &Path,
        plan: &FilePlan,
        rng: &mut R,
    ) -> ShredOutcome {
        if self.cancel.is_cancelled() {
            return ShredOutcome::cancelled(target.to_path_buf());
        }

        let started = Instant::now();
        let outcome = shred_one(target, plan, rng);
        match &outcome {
            ShredOutcome::Success {
                path,
                bytes_overwritten,
            } => self.log(ActivityEvent::FileShredded {
                path: path.clone(),
                bytes: *bytes_overwritten,
                renames: plan.rename_passes,
                fill_mode: plan.mode,
                duration_ms: duration_ms(started.elapsed()),
            }),
            ShredOutcome::Failed {
                path,
                reason,
                residual_path,
            } => self.log(ActivityEvent::FileShredFailed {
                path: path.clone(),
                residual_path: residual_path.clone(),
                error_code: reason.code().to_string(),
                error_message: reason.to_string(),
            }),
        }
        outcome
    }

    fn reap_folders(&self, root: &Path) -> ReapReport {
        let report = reaper::reap_with(
            root,
            root,
            ReapOptions {
                cross_devices: self.config.walker.cross_devices,
            },
        );
        for path in &report.removed {
            self.log(ActivityEvent::FolderReaped { path: path.clone() });
        }
        for failure in &report.failures {
            self.log(ActivityEvent::FolderRemovalSkipped {
                path: failure.path.clone(),
                reason: format!("{}: {}", failure.kind, failure.reason),
            });
        }
        report
    }
}

/// Rename → overwrite → unlink for one target.
fn shred_one<R: CryptoRng + ?Sized>(target: &Path, plan: &FilePlan, rng: &mut R) -> ShredOutcome {
    let failed = |reason: ShredError, at: &Path| ShredOutcome::Failed {
        path: target.to_path_buf(),
        reason,
        residual_path: fs::symlink_metadata(at).ok().map(|_| at.to_path_buf()),
    };

    // Reject symlinks and non-regular files before renaming anything.
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_file() => {}
        Ok(_) => {
            return failed(
                ShredError::NotRegularFile {
                    path: target.to_path_buf(),
                },
                target,
            );
        }
        Err(source) => return failed(ShredError::io(target, source), target),
    }

    let mut obfuscator = PathObfuscator::new(target);
    let renamed = obfuscator.run(plan.rename_passes, rng).map(|_| ());
    if let Err(reason) = renamed {
        return failed(reason, obfuscator.current());
    }
    let current = obfuscator.into_path();

    match overwrite::shred(&current, plan.mode, &plan.options, rng) {
        Ok(bytes_overwritten) => ShredOutcome::Success {
            path: target.to_path_buf(),
            bytes_overwritten,
        },
        Err(reason) => failed(reason, &current),
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Shred an explicit list of files.
///
/// `Err` only for problems found before any file is touched (invalid
/// config). Per-file problems are outcomes in the report.
pub fn shred_files(targets: &[PathBuf], config: &ShredConfig) -> Result<ShredReport> {
    shred_files_with(targets, config, &CancellationToken::new(), None)
}

pub fn shred_files_with(
    targets: &[PathBuf],
    config: &ShredConfig,
    cancel: &CancellationToken,
    logger: Option<&ActivityLoggerHandle>,
) -> Result<ShredReport> {
    let mut session = session_for(config, cancel, logger)?;
    session.add_files(targets)?;
    session.confirm()?;
    session.run()
}

/// Shred every regular file under `root`. Subfolders are removed afterwards
/// when both `recursive_delete_folder` and `config.delete_container_folder`
/// are set; `root` itself always survives.
pub fn shred_directory(
    root: &Path,
    recursive_delete_folder: bool,
    config: &ShredConfig,
) -> Result<ShredReport> {
    shred_directory_with(
        root,
        recursive_delete_folder,
        config,
        &CancellationToken::new(),
        None,
    )
}

pub fn shred_directory_with(
    root: &Path,
    recursive_delete_folder: bool,
    config: &ShredConfig,
    cancel: &CancellationToken,
    logger: Option<&ActivityLoggerHandle>,
) -> Result<ShredReport> {
    let mut session = session_for(config, cancel, logger)?;
    session.collect_directory(root, recursive_delete_folder)?;
    session.confirm()?;
    session.run()
}

fn session_for(
    config: &ShredConfig,
    cancel: &CancellationToken,
    logger: Option<&ActivityLoggerHandle>,
) -> Result<ShredSession> {
    let mut session = ShredSession::new(config.clone())?.with_cancellation(cancel.clone());
    if let Some(logger) = logger {
        session = session.with_logger(logger.clone());
    }
    Ok(session)
}

//! Dual-write activity logger: JSONL always, SQLite when the feature is on.
//!
//! A dedicated thread owns both backends. Shred workers send `ActivityEvent`
//! through a bounded crossbeam channel with `try_send`, so a slow disk under
//! the log never stalls an overwrite.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{Result, ShredError};
use crate::core::paths::display_for_log;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
#[cfg(feature = "sqlite")]
use crate::logger::sqlite::{ActivityRow, SqliteLogger};
use crate::shredder::pattern::FillMode;

const CHANNEL_CAPACITY: usize = 1024;

/// Consecutive SQLite failures before the backend is dropped for the run.
#[cfg(feature = "sqlite")]
const SQLITE_FAILURE_LIMIT: u32 = 3;

/// Events the shred engine reports.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    SessionStarted {
        targets: usize,
        fill_mode: FillMode,
        rename_passes: u32,
        folder_root: Option<PathBuf>,
    },
    SessionCompleted {
        succeeded: usize,
        failed: usize,
        bytes_overwritten: u64,
        cancelled: bool,
        duration_ms: u64,
    },
    FileShredded {
        path: PathBuf,
        bytes: u64,
        renames: u32,
        fill_mode: FillMode,
        duration_ms: u64,
    },
    FileShredFailed {
        path: PathBuf,
        residual_path: Option<PathBuf>,
        error_code: String,
        error_message: String,
    },
    FolderReaped {
        path: PathBuf,
    },
    /// Folder teardown could not remove a directory; debug severity.
    FolderRemovalSkipped {
        path: PathBuf,
        reason: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

/// Cheap cloneable sender side of the logger.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Queue an event. Never blocks; a full channel drops the event and bumps
    /// the dropped counter.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and stop. Join the thread afterwards to
    /// be sure every queued line reached disk.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

pub struct DualLoggerConfig {
    /// `None` disables SQLite.
    pub sqlite_path: Option<PathBuf>,
    pub jsonl_config: JsonlConfig,
    pub channel_capacity: usize,
    /// Log `sha256:` digests instead of paths.
    pub redact_paths: bool,
}

impl Default for DualLoggerConfig {
    fn default() -> Self {
        Self {
            sqlite_path: Some(crate::logger::jsonl::default_data_dir().join("activity.sqlite3")),
            jsonl_config: JsonlConfig::default(),
            channel_capacity: CHANNEL_CAPACITY,
            redact_paths: true,
        }
    }
}

/// Spawn the logger thread.
///
/// The thread runs until `shutdown()` is called or every handle is dropped.
pub fn spawn_logger(
    config: DualLoggerConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(config.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));

    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: Arc::clone(&dropped),
    };

    let join = thread::Builder::new()
        .name("fshred-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config, &dropped))
        .map_err(|e| ShredError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

#[allow(clippy::needless_pass_by_value)]
fn logger_thread_main(rx: &Receiver<ActivityEvent>, config: DualLoggerConfig, dropped: &AtomicU64) {
    #[cfg(feature = "sqlite")]
    let mut sqlite = config
        .sqlite_path
        .as_deref()
        .and_then(|p| match SqliteLogger::open(p) {
            Ok(db) => Some(db),
            Err(e) => {
                eprintln!("[FSH-DUAL] failed to open SQLite at {}: {e}", p.display());
                None
            }
        });
    #[cfg(feature = "sqlite")]
    let mut sqlite_failures: u32 = 0;

    let mut jsonl = JsonlWriter::open(config.jsonl_config);
    let redact = config.redact_paths;

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }

        let entry = event_to_log_entry(&event, redact);
        jsonl.write_entry(&entry);

        #[cfg(feature = "sqlite")]
        if let Some(db) = &sqlite {
            if db.log_activity(&entry_to_activity_row(&entry)).is_ok() {
                sqlite_failures = 0;
            } else {
                sqlite_failures += 1;
                if sqlite_failures >= SQLITE_FAILURE_LIMIT {
                    eprintln!("[FSH-DUAL] SQLite write failed {sqlite_failures} times, disabling");
                    sqlite = None;
                }
            }
        }
    }

    jsonl.flush();
    jsonl.fsync();
}

/// Replace every occurrence of `raw` in `message` with its log rendering.
fn scrub(message: &str, paths: &[&Path], redact: bool) -> String {
    if !redact {
        return message.to_string();
    }
    paths.iter().fold(message.to_string(), |acc, path| {
        let raw = path.display().to_string();
        if raw.is_empty() {
            acc
        } else {
            acc.replace(&raw, &display_for_log(path, true))
        }
    })
}

fn event_to_log_entry(event: &ActivityEvent, redact: bool) -> LogEntry {
    match event {
        ActivityEvent::SessionStarted {
            targets,
            fill_mode,
            rename_passes,
            folder_root,
        } => {
            let mut e = LogEntry::new(EventType::SessionStart, Severity::Info);
            e.path = folder_root.as_deref().map(|p| display_for_log(p, redact));
            e.fill_mode = Some(fill_mode.to_string());
            e.renames = Some(*rename_passes);
            e.details = Some(format!("targets={targets}"));
            e
        }
        ActivityEvent::SessionCompleted {
            succeeded,
            failed,
            bytes_overwritten,
            cancelled,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::SessionComplete, Severity::Info);
            e.size = Some(*bytes_overwritten);
            e.duration_ms = Some(*duration_ms);
            e.ok = Some(*failed == 0 && !*cancelled);
            e.details = Some(format!(
                "succeeded={succeeded} failed={failed} cancelled={cancelled}"
            ));
            e
        }
        ActivityEvent::FileShredded {
            path,
            bytes,
            renames,
            fill_mode,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::FileShred, Severity::Info);
            e.path = Some(display_for_log(path, redact));
            e.size = Some(*bytes);
            e.renames = Some(*renames);
            e.fill_mode = Some(fill_mode.to_string());
            e.duration_ms = Some(*duration_ms);
            e.ok = Some(true);
            e
        }
        ActivityEvent::FileShredFailed {
            path,
            residual_path,
            error_code,
            error_message,
        } => {
            let mut e = LogEntry::new(EventType::FileShred, Severity::Warning);
            e.path = Some(display_for_log(path, redact));
            e.residual_path = residual_path.as_deref().map(|p| display_for_log(p, redact));
            e.ok = Some(false);
            e.error_code = Some(error_code.clone());
            let mut mentioned: Vec<&Path> = vec![path.as_path()];
            if let Some(residual) = residual_path {
                mentioned.push(residual.as_path());
            }
            e.error_message = Some(scrub(error_message, &mentioned, redact));
            e
        }
        ActivityEvent::FolderReaped { path } => {
            let mut e = LogEntry::new(EventType::FolderReap, Severity::Info);
            e.path = Some(display_for_log(path, redact));
            e.ok = Some(true);
            e
        }
        ActivityEvent::FolderRemovalSkipped { path, reason } => {
            let mut e = LogEntry::new(EventType::FolderReap, Severity::Debug);
            e.path = Some(display_for_log(path, redact));
            e.ok = Some(false);
            e.details = Some(scrub(reason, &[path.as_path()], redact));
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::SessionComplete, Severity::Debug),
    }
}

#[cfg(feature = "sqlite")]
#[allow(clippy::cast_possible_wrap)]
fn entry_to_activity_row(entry: &LogEntry) -> ActivityRow {
    ActivityRow {
        timestamp: entry.ts.clone(),
        event_type: entry.event.as_str().to_string(),
        severity: entry.severity.as_str().to_string(),
        path: entry.path.clone(),
        residual_path: entry.residual_path.clone(),
        size_bytes: entry.size.map(|s| s as i64),
        renames: entry.renames.map(i64::from),
        fill_mode: entry.fill_mode.clone(),
        duration_ms: entry.duration_ms.map(|d| d as i64),
        success: i32::from(entry.ok.unwrap_or(true)),
        error_code: entry.error_code.clone(),
        error_message: entry.error_message.clone(),
        details: entry.details.clone(),
    }
}

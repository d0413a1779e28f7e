//! End-to-end engine scenarios: whole sessions against real temp trees.

use std::fs;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use file_shredder::core::errors::{FailureKind, ShredError};
use file_shredder::core::signals::CancellationToken;
use file_shredder::logger::dual::{DualLoggerConfig, spawn_logger};
use file_shredder::logger::jsonl::JsonlConfig;
use file_shredder::shredder::obfuscate::obfuscate;
use file_shredder::shredder::overwrite::{OverwriteOptions, overwrite};
use file_shredder::shredder::pattern::FillMode;
use file_shredder::shredder::reaper::reap;
use file_shredder::shredder::session::{
    SessionState, ShredConfig, ShredOutcome, ShredSession, shred_directory, shred_files,
    shred_files_with,
};
use file_shredder::shredder::walker::walk;

fn fast_config(mode: FillMode) -> ShredConfig {
    ShredConfig {
        fill_mode: Some(mode),
        rename_passes: 3,
        sync_writes: false,
        ..ShredConfig::default()
    }
}

fn write_file(path: &Path, len: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![0xA5u8; len]).unwrap();
}

fn dir_is_empty(path: &Path) -> bool {
    fs::read_dir(path).unwrap().next().is_none()
}

#[test]
fn zero_fill_without_rename_removes_file() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("ten-thousand.bin");
    write_file(&target, 10_000);

    let config = ShredConfig {
        rename_enabled: false,
        ..fast_config(FillMode::Zero)
    };
    let report = shred_files(&[target.clone()], &config).unwrap();

    assert_eq!(report.outcomes.len(), 1);
    match &report.outcomes[0] {
        ShredOutcome::Success {
            path,
            bytes_overwritten,
        } => {
            assert_eq!(path, &target);
            assert_eq!(*bytes_overwritten, 10_000);
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert!(!target.exists());
    assert!(dir_is_empty(tmp.path()));
}

#[test]
fn nonexistent_target_is_reported_not_found() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("never-existed.txt");

    let report = shred_files(&[target.clone()], &fast_config(FillMode::Random)).unwrap();

    assert_eq!(report.failed(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.path(), target.as_path());
    assert_eq!(outcome.failure_kind(), Some(FailureKind::NotFound));
    assert!(report.pending_paths().is_empty());
}

#[test]
fn directory_shred_removes_nested_subfolders_and_keeps_root() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    write_file(&root.join("outer/one.txt"), 100);
    write_file(&root.join("outer/inner/two.txt"), 5_000);
    write_file(&root.join("outer/inner/three.txt"), 1);

    let report = shred_directory(&root, true, &fast_config(FillMode::Max)).unwrap();

    assert_eq!(report.succeeded(), 3);
    assert!(report.is_clean());
    assert!(root.exists());
    assert!(!root.join("outer").exists());
    assert!(dir_is_empty(&root));
    let cleanup = report.folder_cleanup.expect("folder teardown ran");
    assert_eq!(cleanup.removed.len(), 2);
    assert!(cleanup.is_complete());
}

#[test]
fn directory_shred_keeps_folders_when_disabled() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write_file(&root.join("a/b/file.txt"), 64);

    let config = ShredConfig {
        delete_container_folder: false,
        ..fast_config(FillMode::Zero)
    };
    let report = shred_directory(root, true, &config).unwrap();

    assert_eq!(report.succeeded(), 1);
    assert!(report.folder_cleanup.is_none());
    assert!(root.join("a/b").is_dir());
    assert!(dir_is_empty(&root.join("a/b")));
}

#[test]
fn directory_shred_without_recursive_delete_keeps_folders() {
    let tmp = TempDir::new().unwrap();
    write_file(&tmp.path().join("a/file.txt"), 64);

    let report = shred_directory(tmp.path(), false, &fast_config(FillMode::Zero)).unwrap();
    assert!(report.folder_cleanup.is_none());
    assert!(tmp.path().join("a").is_dir());
}

#[test]
fn directory_shred_rejects_file_root() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("plain.txt");
    write_file(&file, 10);

    let err = shred_directory(&file, true, &fast_config(FillMode::Zero)).unwrap_err();
    assert!(matches!(err, ShredError::NotADirectory { .. }));
    assert!(file.exists());
}

#[test]
fn walk_returns_exactly_the_regular_files() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let mut expected = vec![
        root.join("top.txt"),
        root.join("a/mid.txt"),
        root.join("a/b/c/deep.txt"),
    ];
    for path in &expected {
        write_file(path, 8);
    }
    fs::create_dir_all(root.join("empty/dir")).unwrap();

    let mut files = walk(root).unwrap().files;
    files.sort();
    expected.sort();
    assert_eq!(files, expected);
}

#[test]
fn reap_on_root_never_deletes_root() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("x/y")).unwrap();

    let report = reap(tmp.path(), tmp.path());
    assert!(tmp.path().is_dir());
    assert!(!tmp.path().join("x").exists());
    assert!(report.is_complete());
}

#[test]
fn obfuscate_moves_within_parent_and_zero_passes_is_identity() {
    let tmp = TempDir::new().unwrap();
    let original = tmp.path().join("report-final.docx");
    write_file(&original, 32);
    let mut rng = StdRng::seed_from_u64(7);

    let same = obfuscate(&original, 0, &mut rng).unwrap();
    assert_eq!(same, original);
    assert!(original.exists());

    let renamed = obfuscate(&original, 5, &mut rng).unwrap();
    assert_ne!(renamed, original);
    assert_eq!(renamed.parent(), original.parent());
    assert!(!original.exists());
    assert_eq!(fs::read(&renamed).unwrap().len(), 32);
}

#[test]
fn constant_fills_cover_every_byte_before_unlink() {
    let tmp = TempDir::new().unwrap();
    let options = OverwriteOptions {
        chunk_size: 4096,
        sync_writes: false,
    };
    let mut rng = StdRng::seed_from_u64(1);

    for (mode, byte) in [(FillMode::Zero, 0x00u8), (FillMode::Max, 0xFF)] {
        let path = tmp.path().join(format!("{mode}.bin"));
        write_file(&path, 10_001);
        let written = overwrite(&path, mode, &options, &mut rng).unwrap();
        assert_eq!(written, 10_001);
        let contents = fs::read(&path).unwrap();
        assert_eq!(contents.len(), 10_001);
        assert!(contents.iter().all(|b| *b == byte), "{mode} left stray bytes");
    }
}

#[test]
fn random_fill_shows_variance() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("random.bin");
    write_file(&path, 8192);
    let mut rng = StdRng::seed_from_u64(99);

    overwrite(&path, FillMode::Random, &OverwriteOptions::default(), &mut rng).unwrap();
    let contents = fs::read(&path).unwrap();
    let distinct: std::collections::HashSet<u8> = contents.iter().copied().collect();
    assert!(distinct.len() > 200, "only {} distinct bytes", distinct.len());
    assert!(contents.iter().filter(|b| **b == 0xA5).count() < 200);
}

#[test]
fn missing_fill_mode_is_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("keep.txt");
    write_file(&target, 16);

    let config = ShredConfig {
        fill_mode: None,
        ..ShredConfig::default()
    };
    let err = shred_files(&[target.clone()], &config).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Configuration);
    assert!(target.exists());
}

#[test]
fn cancelled_session_leaves_files_untouched() {
    let tmp = TempDir::new().unwrap();
    let targets: Vec<PathBuf> = (0..3).map(|i| tmp.path().join(format!("f{i}"))).collect();
    for path in &targets {
        write_file(path, 128);
    }

    let token = CancellationToken::new();
    token.cancel();
    let report = shred_files_with(&targets, &fast_config(FillMode::Zero), &token, None).unwrap();

    assert!(report.cancelled);
    assert_eq!(report.succeeded(), 0);
    for outcome in &report.outcomes {
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Cancelled));
    }
    for path in &targets {
        assert_eq!(fs::read(path).unwrap(), vec![0xA5u8; 128]);
    }
    assert_eq!(report.pending_paths().len(), 3);
}

#[test]
fn parallel_session_keeps_submission_order() {
    let tmp = TempDir::new().unwrap();
    let mut targets: Vec<PathBuf> = (0..24)
        .map(|i| tmp.path().join(format!("file-{i:02}.bin")))
        .collect();
    for (i, path) in targets.iter().enumerate() {
        write_file(path, 100 * (i + 1));
    }
    targets.insert(5, tmp.path().join("missing.bin"));

    let config = ShredConfig {
        parallelism: 4,
        ..fast_config(FillMode::Random)
    };
    let report = shred_files(&targets, &config).unwrap();

    assert_eq!(report.outcomes.len(), targets.len());
    for (outcome, target) in report.outcomes.iter().zip(&targets) {
        assert_eq!(outcome.path(), target.as_path());
    }
    assert_eq!(report.succeeded(), 24);
    assert_eq!(report.failed(), 1);
    assert_eq!(
        report.outcomes[5].failure_kind(),
        Some(FailureKind::NotFound)
    );
    assert!(dir_is_empty(tmp.path()));
}

#[test]
fn session_state_machine_allows_abort_before_run() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("declined.txt");
    write_file(&target, 10);

    let mut session = ShredSession::new(fast_config(FillMode::Zero)).unwrap();
    assert_eq!(session.state(), SessionState::Idle);
    session.add_files(&[target.clone()]).unwrap();
    assert_eq!(session.state(), SessionState::Collecting);
    session.abort().unwrap();
    assert_eq!(session.state(), SessionState::Aborted);
    assert!(session.run().is_err());
    assert!(target.exists());
}

#[cfg(unix)]
#[test]
fn symlink_targets_are_not_followed() {
    let tmp = TempDir::new().unwrap();
    let real = tmp.path().join("real.txt");
    write_file(&real, 50);
    let link = tmp.path().join("link.txt");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let report = shred_files(&[link.clone()], &fast_config(FillMode::Zero)).unwrap();
    assert_eq!(report.failed(), 1);
    assert_eq!(fs::read(&real).unwrap(), vec![0xA5u8; 50]);
    assert!(fs::symlink_metadata(&link).is_ok());
}

#[test]
fn activity_log_records_redacted_events() {
    let tmp = TempDir::new().unwrap();
    let logs = tmp.path().join("logs");
    let target = tmp.path().join("secret-plans.txt");
    write_file(&target, 2_048);

    let (handle, join) = spawn_logger(DualLoggerConfig {
        sqlite_path: Some(logs.join("activity.sqlite3")),
        jsonl_config: JsonlConfig {
            path: logs.join("activity.jsonl"),
            fallback_path: None,
            ..JsonlConfig::default()
        },
        redact_paths: true,
        ..DualLoggerConfig::default()
    })
    .unwrap();

    let report = shred_files_with(
        &[target],
        &fast_config(FillMode::Zero),
        &CancellationToken::new(),
        Some(&handle),
    )
    .unwrap();
    assert_eq!(report.succeeded(), 1);

    handle.shutdown();
    join.join().unwrap();

    let jsonl = fs::read_to_string(logs.join("activity.jsonl")).unwrap();
    assert!(jsonl.contains("\"event\":\"session_start\""));
    assert!(jsonl.contains("\"event\":\"file_shred\""));
    assert!(jsonl.contains("\"event\":\"session_complete\""));
    assert!(jsonl.contains("sha256:"));
    assert!(!jsonl.contains("secret-plans"));

    #[cfg(feature = "sqlite")]
    {
        let db = file_shredder::logger::sqlite::SqliteLogger::open(&logs.join("activity.sqlite3"))
            .unwrap();
        assert_eq!(db.bytes_shredded_since("2000-01-01T00:00:00Z").unwrap(), 2_048);
    }
}

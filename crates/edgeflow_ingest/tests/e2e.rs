//! End-to-end tests for the ingestion engine
//!
//! These drive real directories through scan → claim → handle → archive.

use chrono::{Duration as ChronoDuration, Utc};
use edgeflow_ingest::{EngineConfig, FnHandler, IngestEngine, Outcome, SharedHandler};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Temp root plus an engine with default timings
struct TestEnv {
    _temp: TempDir,
    pub root: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }
}

/// Write a file and push its mtime back so it clears the stability window.
fn drop_stable(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write file");
    age(&path, 30);
    path
}

fn age(path: &Path, secs: i64) {
    let aged = FileTime::from_unix_time(FileTime::now().unix_seconds() - secs, 0);
    set_file_mtime(path, aged).expect("Failed to set mtime");
}

/// Handler that fails on any file whose content contains "bad"
fn json_handler(calls: Arc<AtomicUsize>) -> SharedHandler {
    FnHandler::shared("people-count", move |path: PathBuf| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let content = tokio::fs::read_to_string(&path).await?;
            if content.contains("bad") {
                anyhow::bail!("unparseable payload in {}", path.display());
            }
            Ok(())
        }
    })
}

async fn wait_for(path: &Path) -> bool {
    for _ in 0..100 {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

// ============================================================================
// Scenario
// ============================================================================

#[tokio::test]
async fn test_people_count_scenario() {
    let env = TestEnv::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = IngestEngine::new(EngineConfig::default()).unwrap();
    let binding = engine
        .bind(env.root.join("people-count"), "*.json", json_handler(calls.clone()))
        .unwrap();

    drop_stable(&binding.path, "a.json", r#"{"count_in": 4}"#);
    drop_stable(&binding.path, "b.json", "bad");
    let c = binding.path.join("c.json");
    fs::write(&c, r#"{"count_in": 1}"#).unwrap();

    let pass = engine.scan_once().await;
    assert_eq!(pass.admitted.len(), 2);
    assert_eq!(pass.unstable, 1);
    let results = pass.join().await;

    for result in &results {
        let name = result.path.file_name().unwrap().to_str().unwrap();
        match name {
            "a.json" => assert_eq!(result.outcome, Outcome::Success),
            "b.json" => assert!(matches!(result.outcome, Outcome::Failed(_))),
            other => panic!("unexpected file {other}"),
        }
    }
    assert!(binding.processed_dir.join("a.json").exists());
    assert!(binding.failed_dir.join("b.json").exists());
    assert!(!binding.path.join("a.json").exists());
    assert!(!binding.path.join("b.json").exists());
    assert!(c.exists());

    // Still inside the window on an immediate rescan.
    let pass = engine.scan_once().await;
    assert!(pass.admitted.is_empty());

    // Two seconds later (simulated by ageing the mtime) it is admitted.
    age(&c, 2);
    let results = engine.scan_once().await.join().await;
    assert_eq!(results.len(), 1);
    assert!(binding.processed_dir.join("c.json").exists());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

// ============================================================================
// Dedup and eviction
// ============================================================================

#[tokio::test]
async fn test_completed_path_not_readmitted_until_evicted() {
    let env = TestEnv::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = IngestEngine::new(EngineConfig::default()).unwrap();
    let binding = engine
        .bind(env.root.join("vehicle-count"), "*.json", json_handler(calls.clone()))
        .unwrap();

    let original = drop_stable(&binding.path, "v.json", "{}");
    engine.scan_once().await.join().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Re-dropped with the same name inside the completed window: suppressed.
    drop_stable(&binding.path, "v.json", "{}");
    assert!(engine.scan_once().await.admitted.is_empty());
    assert!(engine.tracker().is_completed(&original));

    // Janitor pass with a clock past the retention window.
    let evicted = engine.sweep_completed(Utc::now() + ChronoDuration::hours(3));
    assert_eq!(evicted, 1);
    assert!(!engine.tracker().is_completed(&original));

    let results = engine.scan_once().await.join().await;
    assert_eq!(results.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(engine.stats().evicted, 1);
}

#[tokio::test]
async fn test_janitor_keeps_recent_entries() {
    let env = TestEnv::new();
    let engine = IngestEngine::new(EngineConfig::default()).unwrap();
    let binding = engine
        .bind(
            env.root.join("faces"),
            "*.json",
            json_handler(Arc::new(AtomicUsize::new(0))),
        )
        .unwrap();
    drop_stable(&binding.path, "f.json", "{}");
    engine.scan_once().await.join().await;

    assert_eq!(engine.sweep_completed(Utc::now()), 0);
    assert_eq!(engine.stats().completed, 1);
}

// ============================================================================
// Routing across bindings
// ============================================================================

#[tokio::test]
async fn test_each_binding_uses_its_own_handler_and_pattern() {
    let env = TestEnv::new();
    let people = Arc::new(AtomicUsize::new(0));
    let alerts = Arc::new(AtomicUsize::new(0));
    let engine = IngestEngine::new(EngineConfig::default()).unwrap();

    let people_binding = engine
        .bind(env.root.join("people-count"), "*.json", json_handler(people.clone()))
        .unwrap();
    let alert_binding = engine
        .bind(
            env.root.join("alerts").join("intrusion"),
            "alert_*.json",
            json_handler(alerts.clone()),
        )
        .unwrap();

    drop_stable(&people_binding.path, "p1.json", "{}");
    drop_stable(&alert_binding.path, "alert_1.json", "{}");
    drop_stable(&alert_binding.path, "other.json", "{}");

    let results = engine.scan_once().await.join().await;
    assert_eq!(results.len(), 2);
    assert_eq!(people.load(Ordering::SeqCst), 1);
    assert_eq!(alerts.load(Ordering::SeqCst), 1);
    assert!(alert_binding.path.join("other.json").exists());
    assert!(alert_binding.processed_dir.join("alert_1.json").exists());
}

#[tokio::test]
async fn test_concurrency_cap_is_respected() {
    let env = TestEnv::new();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let config = EngineConfig {
        max_concurrent_files: Some(2),
        ..EngineConfig::default()
    };
    let engine = IngestEngine::new(config).unwrap();

    let (a, p) = (active.clone(), peak.clone());
    let handler = FnHandler::shared("slow", move |_path: PathBuf| {
        let (active, peak) = (a.clone(), p.clone());
        async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    });
    let binding = engine.bind(env.root.join("burst"), "*.json", handler).unwrap();
    for i in 0..8 {
        drop_stable(&binding.path, &format!("f{i}.json"), "{}");
    }

    let results = engine.scan_once().await.join().await;
    assert_eq!(results.len(), 8);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(fs::read_dir(&binding.processed_dir).unwrap().count(), 8);
}

// ============================================================================
// Background loops
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_started_engine_scans_immediately() {
    let env = TestEnv::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = IngestEngine::new(EngineConfig::default()).unwrap();
    let binding = engine
        .bind(env.root.join("people-count"), "*.json", json_handler(calls.clone()))
        .unwrap();
    drop_stable(&binding.path, "a.json", "{}");

    engine.start().unwrap();
    // Well inside the 5s tick: only the initial scan can have picked it up.
    assert!(wait_for(&binding.processed_dir.join("a.json")).await);
    engine.stop().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.stats().scans, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_does_not_cancel_running_handler() {
    let env = TestEnv::new();
    let (release_tx, release_rx) = tokio::sync::watch::channel(false);
    let entered = Arc::new(tokio::sync::Notify::new());

    let notify = entered.clone();
    let handler = FnHandler::shared("gated", move |_path: PathBuf| {
        let mut release_rx = release_rx.clone();
        let notify = notify.clone();
        async move {
            notify.notify_one();
            while !*release_rx.borrow() {
                release_rx.changed().await?;
            }
            Ok(())
        }
    });

    let engine = IngestEngine::new(EngineConfig::default()).unwrap();
    let binding = engine.bind(env.root.join("slow"), "*.json", handler).unwrap();
    let file = drop_stable(&binding.path, "slow.json", "{}");

    engine.start().unwrap();
    entered.notified().await;
    engine.stop().await.unwrap();

    // Loop is gone but the handler is still parked.
    assert!(!engine.is_running());
    assert!(engine.tracker().is_in_flight(&file));
    assert_eq!(engine.stats().active, 1);
    assert!(!engine.wait_idle(Duration::from_millis(50)).await);

    release_tx.send(true).unwrap();
    assert!(engine.wait_idle(Duration::from_secs(10)).await);
    assert!(binding.processed_dir.join("slow.json").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_idle_covers_archive_copy() {
    let env = TestEnv::new();
    let handler = FnHandler::shared("noop", |_path: PathBuf| async { Ok(()) });

    let engine = IngestEngine::new(EngineConfig::default()).unwrap();
    let binding = engine.bind(env.root.join("bulk"), "*.bin", handler).unwrap();

    // Large enough that the copy outlives the handler by a wide margin
    let size: usize = 64 * 1024 * 1024;
    let file = binding.path.join("clip.bin");
    fs::write(&file, vec![7u8; size]).expect("Failed to write file");
    age(&file, 30);

    engine.start().unwrap();
    for _ in 0..500 {
        if engine.stats().admitted == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(engine.stats().admitted, 1);
    engine.stop().await.unwrap();

    assert!(engine.wait_idle(Duration::from_secs(60)).await);

    let archived = binding.processed_dir.join("clip.bin");
    assert_eq!(fs::metadata(&archived).unwrap().len(), size as u64);
    assert!(!file.exists());
    assert!(!binding.processed_dir.join(".clip.bin.partial").exists());
    let stats = engine.stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.succeeded, 1);
}

//! Integration tests for full sync runs against a JSON history file.
//!
//! Key scenarios tested:
//! - Repeated runs never create the same recording twice
//! - The history only grows, and only with ids the target accepted
//! - Partial failures are retried on the next run
//! - Fatal errors and empty runs leave the history file alone

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use plaudsync::{
    CreatedEntry, HistoryStore, InteractionError, JsonHistoryStore, RecordSource, Recording,
    RemoteApiError, SyncError, SyncOptions, SyncTarget, run_sync,
};
use tempfile::TempDir;

struct ListedSource {
    recordings: Mutex<Vec<Recording>>,
}

impl ListedSource {
    fn new(recordings: Vec<Recording>) -> Self {
        Self {
            recordings: Mutex::new(recordings),
        }
    }

    fn push(&self, recording: Recording) {
        self.recordings.lock().unwrap().push(recording);
    }
}

#[async_trait]
impl RecordSource for ListedSource {
    async fn fetch_all(&self) -> Result<Vec<Recording>, InteractionError> {
        Ok(self.recordings.lock().unwrap().clone())
    }
}

struct DownSource;

#[async_trait]
impl RecordSource for DownSource {
    async fn fetch_all(&self) -> Result<Vec<Recording>, InteractionError> {
        Err(InteractionError::Navigation {
            url: "https://web.plaud.ai/".to_string(),
            status: 503,
        })
    }
}

/// Records every created entry; ids listed in `failing` are refused.
#[derive(Default)]
struct RecordingTarget {
    failing: Mutex<Vec<String>>,
    created: Mutex<Vec<Recording>>,
}

impl RecordingTarget {
    fn failing(ids: &[&str]) -> Self {
        let target = Self::default();
        target.set_failing(ids);
        target
    }

    fn set_failing(&self, ids: &[&str]) {
        *self.failing.lock().unwrap() = ids.iter().map(|s| (*s).to_string()).collect();
    }

    fn created(&self) -> Vec<Recording> {
        self.created.lock().unwrap().clone()
    }

    fn created_ids(&self) -> Vec<String> {
        self.created().into_iter().map(|r| r.id).collect()
    }
}

#[async_trait]
impl SyncTarget for RecordingTarget {
    async fn create_entry(&self, record: &Recording) -> Result<CreatedEntry, RemoteApiError> {
        if self.failing.lock().unwrap().contains(&record.id) {
            return Err(RemoteApiError::new(&record.title, "HTTP 500: internal_server_error")
                .with_status(500));
        }
        self.created.lock().unwrap().push(record.clone());
        Ok(CreatedEntry {
            id: format!("page-{}", record.id),
            url: Some(format!("https://www.notion.so/page-{}", record.id)),
        })
    }
}

fn rec(id: &str) -> Recording {
    Recording::new(id, format!("Recording {id}"), "2024-01-01", "A summary")
}

fn options() -> SyncOptions {
    SyncOptions {
        pacing: Duration::ZERO,
        ..SyncOptions::default()
    }
}

fn store_in(dir: &TempDir) -> JsonHistoryStore {
    JsonHistoryStore::new(dir.path().join("synced-recordings.json"))
}

fn read_json(store: &JsonHistoryStore) -> serde_json::Value {
    let data = std::fs::read_to_string(store.path()).expect("history file should exist");
    serde_json::from_str(&data).expect("history file should be valid JSON")
}

#[tokio::test]
async fn test_fresh_start_writes_original_format() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let source = ListedSource::new(vec![rec("r1"), rec("r2")]);
    let target = RecordingTarget::default();

    let report = run_sync(&source, &target, &store, &options(), None)
        .await
        .unwrap();

    assert_eq!(report.summary(), "2/2 synced");
    assert_eq!(read_json(&store), serde_json::json!({"syncedIds": ["r1", "r2"]}));
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let source = ListedSource::new(vec![rec("a"), rec("b")]);
    let target = RecordingTarget::default();

    run_sync(&source, &target, &store, &options(), None)
        .await
        .unwrap();
    let second = run_sync(&source, &target, &store, &options(), None)
        .await
        .unwrap();

    assert_eq!(second.fresh, 0);
    assert_eq!(second.attempted, 0);
    assert_eq!(target.created_ids(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_only_new_recordings_are_created() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let source = ListedSource::new(vec![rec("a")]);
    let target = RecordingTarget::default();

    run_sync(&source, &target, &store, &options(), None)
        .await
        .unwrap();
    source.push(rec("b"));
    let report = run_sync(&source, &target, &store, &options(), None)
        .await
        .unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.fresh, 1);
    assert_eq!(target.created_ids(), vec!["a", "b"]);
    assert_eq!(store.load().synced_ids(), ["a", "b"]);
}

#[tokio::test]
async fn test_partial_failure_is_retried_next_run() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let source = ListedSource::new(vec![rec("A"), rec("B"), rec("C")]);
    let target = RecordingTarget::failing(&["B"]);

    let first = run_sync(&source, &target, &store, &options(), None)
        .await
        .unwrap();
    assert_eq!(first.summary(), "2/3 synced");
    assert_eq!(first.failures[0].title, "Recording B");
    assert_eq!(store.load().synced_ids(), ["A", "C"]);
    assert_eq!(
        read_json(&store),
        serde_json::json!({"syncedIds": ["A", "C"]})
    );

    target.set_failing(&[]);
    let second = run_sync(&source, &target, &store, &options(), None)
        .await
        .unwrap();
    assert_eq!(second.summary(), "1/1 synced");
    assert_eq!(target.created_ids(), vec!["A", "C", "B"]);
    assert_eq!(
        read_json(&store),
        serde_json::json!({"syncedIds": ["A", "C", "B"]})
    );
}

#[tokio::test]
async fn test_history_only_grows() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let target = RecordingTarget::default();

    run_sync(
        &ListedSource::new(vec![rec("x"), rec("y")]),
        &target,
        &store,
        &options(),
        None,
    )
    .await
    .unwrap();
    // The source no longer lists x and y; they stay in the history.
    run_sync(
        &ListedSource::new(vec![rec("z")]),
        &target,
        &store,
        &options(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(store.load().synced_ids(), ["x", "y", "z"]);
}

#[tokio::test]
async fn test_fetch_failure_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), "{\n  \"syncedIds\": [\"keep\"]\n}").unwrap();
    let before = std::fs::read_to_string(store.path()).unwrap();
    let target = RecordingTarget::default();

    let err = run_sync(&DownSource, &target, &store, &options(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Interaction(InteractionError::Navigation { status: 503, .. })
    ));
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    assert!(target.created().is_empty());
}

#[tokio::test]
async fn test_empty_fresh_set_does_not_create_file() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let target = RecordingTarget::default();

    let report = run_sync(&ListedSource::new(Vec::new()), &target, &store, &options(), None)
        .await
        .unwrap();

    assert_eq!(report.synced, 0);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_corrupt_history_is_treated_as_empty() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), "not json").unwrap();
    let target = RecordingTarget::default();

    let report = run_sync(&ListedSource::new(vec![rec("a")]), &target, &store, &options(), None)
        .await
        .unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(read_json(&store), serde_json::json!({"syncedIds": ["a"]}));
}

#[tokio::test]
async fn test_long_summaries_are_truncated() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let mut long = rec("long");
    long.summary = "word ".repeat(1000);
    let target = RecordingTarget::default();

    run_sync(&ListedSource::new(vec![long.clone()]), &target, &store, &options(), None)
        .await
        .unwrap();

    let sent = &target.created()[0].summary;
    assert_eq!(sent.chars().count(), 2000);
    assert!(long.summary.starts_with(sent.as_str()));
}

#[tokio::test]
async fn test_attempt_cap_stops_retrying() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let source = ListedSource::new(vec![rec("bad"), rec("good")]);
    let target = RecordingTarget::failing(&["bad"]);
    let capped = SyncOptions {
        max_attempts: Some(2),
        ..options()
    };

    let mut attempted = HashMap::new();
    for run in 1..=3 {
        let report = run_sync(&source, &target, &store, &capped, None)
            .await
            .unwrap();
        attempted.insert(run, report.attempted);
    }

    assert_eq!(attempted[&1], 2);
    assert_eq!(attempted[&2], 1);
    assert_eq!(attempted[&3], 0);
    assert_eq!(
        read_json(&store),
        serde_json::json!({"syncedIds": ["good"], "failedAttempts": {"bad": 2}, "deadIds": ["bad"]})
    );
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let target = RecordingTarget::default();
    let dry = SyncOptions {
        dry_run: true,
        ..options()
    };

    let report = run_sync(&ListedSource::new(vec![rec("a"), rec("b")]), &target, &store, &dry, None)
        .await
        .unwrap();

    assert_eq!(report.planned.len(), 2);
    assert!(target.created().is_empty());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_save_into_missing_directory() {
    let dir = TempDir::new().unwrap();
    let store = JsonHistoryStore::new(dir.path().join("nested/state/history.json"));
    let target = RecordingTarget::default();

    run_sync(&ListedSource::new(vec![rec("a")]), &target, &store, &options(), None)
        .await
        .unwrap();

    assert_eq!(store.load().synced_ids(), ["a"]);
}

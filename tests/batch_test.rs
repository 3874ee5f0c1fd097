//! Scheduler integration tests, driven through a scripted scan provider.

use passport_scanner::batch::{run_batch, Batch, BatchConfig, ItemStatus};
use passport_scanner::export;
use passport_scanner::scan::{RawScanResult, ScanError, ScanInput, ScanProvider};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted provider: per-file outcomes and latency, plus in-flight
/// accounting so tests can assert the concurrency ceiling.
struct MockProvider {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
    fail_files: HashSet<String>,
    delays_ms: HashMap<String, u64>,
    default_delay_ms: u64,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(HashMap::new()),
            fail_files: HashSet::new(),
            delays_ms: HashMap::new(),
            default_delay_ms: 10,
        }
    }

    fn failing_on(mut self, files: &[&str]) -> Self {
        self.fail_files = files.iter().map(|f| f.to_string()).collect();
        self
    }

    fn with_delay(mut self, file: &str, ms: u64) -> Self {
        self.delays_ms.insert(file.to_string(), ms);
        self
    }

    fn max_seen(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn call_counts(&self) -> HashMap<String, usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ScanProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn scan(&self, input: &ScanInput) -> Result<RawScanResult, ScanError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(input.filename.clone())
            .or_insert(0) += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self
            .delays_ms
            .get(&input.filename)
            .copied()
            .unwrap_or(self.default_delay_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_files.contains(&input.filename) {
            return Err(ScanError::Provider {
                status: 500,
                message: format!("simulated failure for {}", input.filename),
            });
        }

        // Document ID derives from the file contents so tests control
        // duplicate pairs by uploading identical bytes.
        let doc_id = format!("DOC-{}", input.data[0]);
        Ok(RawScanResult {
            document_id: Some(doc_id),
            surname: Some("SMITH".to_string()),
            given_name: Some("JOHN".to_string()),
            nationality: Some("USA".to_string()),
            date_of_birth: Some("1990-05-14".to_string()),
            date_of_expiry: Some("14/05/2030".to_string()),
            place_of_birth: Some("Ireland".to_string()),
            sex: Some("M".to_string()),
            ..Default::default()
        })
    }
}

fn config(k: usize) -> BatchConfig {
    BatchConfig {
        concurrency: k,
        scan_timeout_secs: 5,
        rng_seed: Some(42),
        ..Default::default()
    }
}

fn fill_batch(batch: &Batch, n: usize) {
    for i in 0..n {
        batch.add_file(
            format!("passport_{:02}.jpg", i),
            "image/jpeg".to_string(),
            vec![i as u8, 0xFF],
        );
    }
}

#[tokio::test]
async fn test_in_flight_scans_never_exceed_concurrency_limit() {
    let provider = Arc::new(MockProvider::new());
    let batch = Batch::new();
    fill_batch(&batch, 20);

    let counters = run_batch(&batch, provider.clone(), &config(5))
        .await
        .unwrap();

    assert!(provider.max_seen() <= 5, "saw {} in flight", provider.max_seen());
    assert_eq!(counters.completed, 20);
    assert!(!batch.is_processing());
}

#[tokio::test]
async fn test_every_item_scanned_exactly_once() {
    let provider = Arc::new(MockProvider::new());
    let batch = Batch::new();
    fill_batch(&batch, 12);

    run_batch(&batch, provider.clone(), &config(4)).await.unwrap();

    let calls = provider.call_counts();
    assert_eq!(calls.len(), 12);
    assert!(calls.values().all(|&c| c == 1), "an item was scanned twice");

    let snap = batch.snapshot();
    assert!(snap.items.iter().all(|i| i.status.is_terminal()));
}

#[tokio::test]
async fn test_failures_do_not_stop_siblings() {
    // 10 valid files, provider fails on items 3 and 7, K=5.
    let provider = Arc::new(
        MockProvider::new().failing_on(&["passport_03.jpg", "passport_07.jpg"]),
    );
    let batch = Batch::new();
    fill_batch(&batch, 10);

    let counters = run_batch(&batch, provider, &config(5)).await.unwrap();

    assert_eq!(counters.completed, 8);
    assert_eq!(counters.failed, 2);
    assert_eq!(counters.duplicates, 0);
    assert!(!batch.is_processing());

    let snap = batch.snapshot();
    assert_eq!(
        snap.items
            .iter()
            .filter(|i| i.status == ItemStatus::Processing)
            .count(),
        0
    );

    let failed: Vec<&str> = snap
        .items
        .iter()
        .filter(|i| i.status == ItemStatus::Error)
        .map(|i| i.filename.as_str())
        .collect();
    assert_eq!(failed, vec!["passport_03.jpg", "passport_07.jpg"]);
    assert!(snap
        .items
        .iter()
        .filter(|i| i.status == ItemStatus::Error)
        .all(|i| i.error.is_some()));

    // Completion order is not guaranteed, so the export is checked as a
    // set of document IDs, not a fixed sequence.
    let records = batch.completed_records();
    assert_eq!(records.len(), 8);
    let exported_ids: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
    let expected_ids: HashSet<String> = (0..10u8)
        .filter(|i| *i != 3 && *i != 7)
        .map(|i| format!("DOC-{}", i))
        .collect();
    assert_eq!(exported_ids, expected_ids);

    let csv = export::to_csv(&records).unwrap();
    let text = String::from_utf8(csv).unwrap();
    assert_eq!(text.trim_end().split("\r\n").count(), 9); // header + 8 rows
}

#[tokio::test]
async fn test_duplicate_pair_yields_one_completed_any_interleaving() {
    // Same file bytes → same document ID. Vary which scan resolves first.
    for (delay_a, delay_b) in [(50u64, 5u64), (5, 50)] {
        let provider = Arc::new(
            MockProvider::new()
                .with_delay("a.jpg", delay_a)
                .with_delay("b.jpg", delay_b),
        );
        let batch = Batch::new();
        batch.add_file("a.jpg".to_string(), "image/jpeg".to_string(), vec![9, 1]);
        batch.add_file("b.jpg".to_string(), "image/jpeg".to_string(), vec![9, 2]);

        let counters = run_batch(&batch, provider, &config(2)).await.unwrap();

        assert_eq!(counters.completed, 1, "delays {:?}", (delay_a, delay_b));
        assert_eq!(counters.duplicates, 1);

        let snap = batch.snapshot();
        let statuses: Vec<ItemStatus> = snap.items.iter().map(|i| i.status).collect();
        assert!(statuses.contains(&ItemStatus::Completed));
        assert!(statuses.contains(&ItemStatus::Duplicate));

        // The duplicate keeps its raw result for inspection but exports
        // nothing.
        let dup = snap
            .items
            .iter()
            .find(|i| i.status == ItemStatus::Duplicate)
            .unwrap();
        assert!(dup.raw.is_some());
        assert!(dup.record.is_none());
        assert_eq!(batch.completed_records().len(), 1);
    }
}

#[tokio::test]
async fn test_dedup_disabled_normalizes_everything() {
    let provider = Arc::new(MockProvider::new());
    let batch = Batch::new();
    batch.add_file("a.jpg".to_string(), "image/jpeg".to_string(), vec![9, 1]);
    batch.add_file("b.jpg".to_string(), "image/jpeg".to_string(), vec![9, 2]);

    let mut cfg = config(2);
    cfg.dedup_enabled = false;
    let counters = run_batch(&batch, provider, &cfg).await.unwrap();

    assert_eq!(counters.completed, 2);
    assert_eq!(counters.duplicates, 0);
}

#[tokio::test]
async fn test_hung_scan_times_out_and_frees_its_slot() {
    let provider = Arc::new(MockProvider::new().with_delay("stuck.jpg", 30_000));
    let batch = Batch::new();
    batch.add_file("stuck.jpg".to_string(), "image/jpeg".to_string(), vec![1, 0]);
    batch.add_file("ok.jpg".to_string(), "image/jpeg".to_string(), vec![2, 0]);

    let mut cfg = config(1);
    cfg.scan_timeout_secs = 1;
    let counters = run_batch(&batch, provider, &cfg).await.unwrap();

    assert_eq!(counters.completed, 1);
    assert_eq!(counters.failed, 1);
    let snap = batch.snapshot();
    let stuck = snap.items.iter().find(|i| i.filename == "stuck.jpg").unwrap();
    assert_eq!(stuck.status, ItemStatus::Error);
    assert!(stuck.error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_empty_batch_run_is_a_noop() {
    let provider = Arc::new(MockProvider::new());
    let batch = Batch::new();
    let counters = run_batch(&batch, provider, &config(5)).await.unwrap();
    assert_eq!(counters.completed, 0);
    assert!(!batch.is_processing());
}

#[tokio::test]
async fn test_clear_allowed_after_run_completes() {
    let provider = Arc::new(MockProvider::new());
    let batch = Batch::new();
    fill_batch(&batch, 3);

    run_batch(&batch, provider, &config(2)).await.unwrap();
    batch.clear().unwrap();

    let snap = batch.snapshot();
    assert_eq!(snap.total, 0);
    assert_eq!(snap.counters.completed, 0);
}

#[tokio::test]
async fn test_seeded_runs_produce_identical_records() {
    let make = || async {
        let provider = Arc::new(MockProvider::new());
        let batch = Batch::new();
        fill_batch(&batch, 6);
        run_batch(&batch, provider, &config(3)).await.unwrap();
        batch.completed_records()
    };

    let mut a = make().await;
    let mut b = make().await;
    a.sort_by(|x, y| x.id.cmp(&y.id));
    b.sort_by(|x, y| x.id.cmp(&y.id));
    assert_eq!(a, b);
}

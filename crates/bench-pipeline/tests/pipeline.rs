//! End-to-end pipeline scenarios against in-memory sinks.

use async_trait::async_trait;
use bench_generator::Lookup;
use bench_pipeline::sink::with_transient_retry;
use bench_pipeline::{
    BackendSink, Pipeline, PipelineConfig, PipelineError, RetryPolicy, SinkError, TransientPolicy,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Accepts every batch and records what it saw.
#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<Vec<Lookup>>>,
}

#[async_trait]
impl BackendSink for RecordingSink {
    async fn insert_batch(&self, batch: &[Lookup]) -> Result<u64, SinkError> {
        self.batches.lock().await.push(batch.to_vec());
        Ok(batch.len() as u64)
    }
}

/// Simulates the document-bulk drop path: every batch conflicts and is
/// absorbed, applying zero records.
#[derive(Default)]
struct ConflictDropSink {
    dropped_batches: AtomicU64,
}

#[async_trait]
impl BackendSink for ConflictDropSink {
    async fn insert_batch(&self, batch: &[Lookup]) -> Result<u64, SinkError> {
        let _ = batch;
        self.dropped_batches.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

/// First backend write attempt fails with a transient error, then all
/// succeed; retries internally like the document-bulk sink.
struct FlakyTransientSink {
    attempts: AtomicU64,
    policy: TransientPolicy,
}

impl FlakyTransientSink {
    fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            policy: TransientPolicy::Retry(RetryPolicy {
                initial_backoff: Duration::from_millis(1),
                ..RetryPolicy::default()
            }),
        }
    }
}

#[async_trait]
impl BackendSink for FlakyTransientSink {
    async fn insert_batch(&self, batch: &[Lookup]) -> Result<u64, SinkError> {
        with_transient_retry(&self.policy, "flaky", || async {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SinkError::Transient("socket read timed out".into()))
            } else {
                Ok(batch.len() as u64)
            }
        })
        .await
    }
}

/// Fails every batch hard, like a relational sink with the default policy.
struct FatalSink;

#[async_trait]
impl BackendSink for FatalSink {
    async fn insert_batch(&self, _batch: &[Lookup]) -> Result<u64, SinkError> {
        Err(SinkError::Backend("relation \"lookup\" does not exist".into()))
    }
}

/// Never returns; used to exercise the stuck-worker abort.
struct HangingSink;

#[async_trait]
impl BackendSink for HangingSink {
    async fn insert_batch(&self, _batch: &[Lookup]) -> Result<u64, SinkError> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

#[tokio::test]
async fn test_exact_batching_and_conservation() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::configure(PipelineConfig::new(1_000, 100, 4)).unwrap();

    let result = pipeline.run(sink.clone()).await.unwrap();

    assert_eq!(result.inserted_count, 1_000);
    let batches = sink.batches.lock().await;
    assert_eq!(batches.len(), 10);
    assert!(batches.iter().all(|b| b.len() == 100));
}

#[tokio::test]
async fn test_partial_final_batch_is_flushed() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::configure(PipelineConfig::new(250, 100, 2)).unwrap();

    let result = pipeline.run(sink.clone()).await.unwrap();

    assert_eq!(result.inserted_count, 250);
    let mut sizes: Vec<usize> = sink.batches.lock().await.iter().map(|b| b.len()).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![50, 100, 100]);
}

#[tokio::test]
async fn test_check_ids_are_unique_across_the_run() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::configure(PipelineConfig::new(1_000, 100, 4)).unwrap();
    pipeline.run(sink.clone()).await.unwrap();

    let batches = sink.batches.lock().await;
    let check_ids: BTreeSet<i64> = batches
        .iter()
        .flatten()
        .map(|lookup| lookup.check_id())
        .collect();
    assert_eq!(check_ids.len(), 1_000);

    // Every issued check id appears in the frozen snapshot.
    let snapshot = pipeline.snapshot_check_ids().unwrap();
    assert_eq!(snapshot.len(), 1_000);
    assert_eq!(check_ids, snapshot.iter().copied().collect());
}

#[tokio::test]
async fn test_sequence_ids_are_never_reused() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::configure(PipelineConfig::new(500, 64, 4)).unwrap();
    pipeline.run(sink.clone()).await.unwrap();

    let batches = sink.batches.lock().await;
    let mut archival_ids: Vec<i64> = batches
        .iter()
        .flatten()
        .map(|lookup| lookup.archival_id)
        .collect();
    archival_ids.sort_unstable();
    assert_eq!(archival_ids, (1..=500).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_conflict_drops_complete_with_zero_inserted() {
    let sink = Arc::new(ConflictDropSink::default());
    let mut pipeline = Pipeline::configure(PipelineConfig::new(1_000, 100, 4)).unwrap();

    let result = pipeline.run(sink.clone()).await.unwrap();

    assert_eq!(result.inserted_count, 0);
    assert_eq!(sink.dropped_batches.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn test_transient_failure_is_retried_once_then_succeeds() {
    let sink = Arc::new(FlakyTransientSink::new());
    let mut pipeline = Pipeline::configure(PipelineConfig::new(400, 100, 2)).unwrap();

    let result = pipeline.run(sink.clone()).await.unwrap();

    assert_eq!(result.inserted_count, 400);
    // Four batches plus exactly one extra attempt for the transient failure.
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_fatal_sink_error_aborts_the_run() {
    let sink = Arc::new(FatalSink);
    let mut pipeline = Pipeline::configure(PipelineConfig::new(1_000, 100, 4)).unwrap();

    let err = pipeline.run(sink).await.unwrap_err();
    match err {
        PipelineError::Sink { inserted, .. } => assert_eq!(inserted, 0),
        other => panic!("expected sink error, got {other}"),
    }
    // No snapshot is frozen for a failed run.
    assert!(matches!(
        pipeline.snapshot_check_ids(),
        Err(PipelineError::NotCompleted)
    ));
}

#[tokio::test]
async fn test_stuck_loaders_are_named_and_fatal() {
    let sink = Arc::new(HangingSink);
    // Small enough that the producer finishes: 2 loaders hold one batch
    // each and 2 batches sit in the channel.
    let config = PipelineConfig::new(8, 2, 2)
        .with_channel_capacity(2)
        .with_poll_timeout(Duration::from_millis(50))
        .with_shutdown_grace(Duration::from_millis(200));
    let mut pipeline = Pipeline::configure(config).unwrap();

    let err = pipeline.run(sink).await.unwrap_err();
    match err {
        PipelineError::StuckWorkers { workers, .. } => {
            assert_eq!(workers.len(), 2);
            assert!(workers.contains(&"loader-0".to_string()));
            assert!(workers.contains(&"loader-1".to_string()));
        }
        other => panic!("expected stuck-worker error, got {other}"),
    }
}

#[tokio::test]
async fn test_snapshot_is_idempotent() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::configure(PipelineConfig::new(300, 50, 2)).unwrap();
    pipeline.run(sink).await.unwrap();

    let first: Vec<i64> = pipeline.snapshot_check_ids().unwrap().to_vec();
    let second: Vec<i64> = pipeline.snapshot_check_ids().unwrap().to_vec();
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_rerunning_a_consumed_pipeline_fails() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::configure(PipelineConfig::new(100, 50, 2)).unwrap();
    pipeline.run(sink.clone()).await.unwrap();

    assert!(matches!(
        pipeline.run(sink).await,
        Err(PipelineError::AlreadyRan)
    ));
}

#[tokio::test]
async fn test_configuration_errors_reject_before_running() {
    assert!(matches!(
        Pipeline::configure(PipelineConfig::new(0, 100, 4)),
        Err(PipelineError::Config(_))
    ));
    assert!(matches!(
        Pipeline::configure(PipelineConfig::new(1_000, 0, 4)),
        Err(PipelineError::Config(_))
    ));
    assert!(matches!(
        Pipeline::configure(PipelineConfig::new(1_000, 100, 0)),
        Err(PipelineError::Config(_))
    ));
}

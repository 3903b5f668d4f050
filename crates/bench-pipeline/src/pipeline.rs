//! Pipeline coordinator: producer task, loader pool, bounded shutdown.

use crate::channel::{batch_channel, BatchReceiver, BatchSender, Polled};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metrics::RunResult;
use crate::sink::BackendSink;
use bench_generator::LookupGenerator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Coordinates one bulk-load run: a single producer generating batches into
/// the bounded channel and a pool of loaders draining it into the sink.
///
/// Owns the generator's identifier sets for the duration of the load; after
/// a successful run the issued `CHECK_ID` set is frozen into a sorted
/// snapshot for the read benchmark and the live sets are dropped.
pub struct Pipeline {
    config: PipelineConfig,
    generator: Option<LookupGenerator>,
    check_id_snapshot: Option<Vec<i64>>,
}

impl Pipeline {
    /// Validate the configuration and prepare a pipeline.
    pub fn configure(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let generator = LookupGenerator::new(config.seed);
        Ok(Self {
            config,
            generator: Some(generator),
            check_id_snapshot: None,
        })
    }

    /// Execute the load to completion.
    ///
    /// Spawns the producer and `worker_count` loaders, waits for the
    /// producer, then waits for the loader pool under the configured grace
    /// period. A loader that fails to terminate in time is fatal: the run
    /// aborts naming every loader still alive.
    pub async fn run(&mut self, sink: Arc<dyn BackendSink>) -> Result<RunResult, PipelineError> {
        let generator = self.generator.take().ok_or(PipelineError::AlreadyRan)?;
        let config = self.config.clone();
        let start = Instant::now();

        info!(
            "starting load: {} records, bulk size {}, {} loaders, channel capacity {}",
            config.target_record_count,
            config.bulk_size,
            config.worker_count,
            config.channel_capacity
        );

        let (tx, rx) = batch_channel(config.channel_capacity);
        let counter = Arc::new(AtomicU64::new(0));

        let producer = tokio::spawn(produce(
            generator,
            tx,
            config.target_record_count,
            config.bulk_size,
        ));

        let mut loaders: Vec<(String, JoinHandle<Result<(), PipelineError>>)> = Vec::new();
        for i in 0..config.worker_count {
            let name = format!("loader-{i}");
            let handle = tokio::spawn(consume(
                name.clone(),
                rx.clone(),
                sink.clone(),
                counter.clone(),
                config.target_record_count,
                config.poll_timeout,
            ));
            loaders.push((name, handle));
        }

        // The producer dropping its sender is the completion signal the
        // loaders observe once the queue has drained.
        let generator = match producer.await {
            Ok(generator) => generator,
            Err(e) => return Err(PipelineError::Join(format!("producer: {e}"))),
        };

        let deadline = Instant::now() + config.shutdown_grace;
        let mut first_error: Option<PipelineError> = None;
        let mut stuck: Vec<String> = Vec::new();

        for (name, mut handle) in loaders {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, &mut handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    first_error.get_or_insert(e);
                }
                Ok(Err(join_error)) => {
                    first_error
                        .get_or_insert(PipelineError::Join(format!("{name}: {join_error}")));
                }
                Err(_) => {
                    error!("{name}: still running after the shutdown grace period");
                    handle.abort();
                    stuck.push(name);
                }
            }
        }

        if !stuck.is_empty() {
            return Err(PipelineError::StuckWorkers {
                grace: config.shutdown_grace,
                workers: stuck,
            });
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let inserted_count = counter.load(Ordering::Relaxed);
        let elapsed = start.elapsed();
        info!(
            "load complete: {}/{} records in {:?}",
            inserted_count, config.target_record_count, elapsed
        );

        // Freeze the issued CHECK_ID set and reclaim the live sets.
        self.check_id_snapshot = Some(generator.freeze_check_ids());

        Ok(RunResult {
            inserted_count,
            elapsed,
        })
    }

    /// The frozen, sorted set of issued `CHECK_ID` values.
    ///
    /// Only available after [`Pipeline::run`] has completed successfully.
    pub fn snapshot_check_ids(&self) -> Result<&[i64], PipelineError> {
        self.check_id_snapshot
            .as_deref()
            .ok_or(PipelineError::NotCompleted)
    }
}

/// Generate `target` records, flushing full batches into the channel and a
/// final partial batch at the end. Returns the generator so the coordinator
/// can freeze its identifier sets.
async fn produce(
    mut generator: LookupGenerator,
    tx: BatchSender,
    target: u64,
    bulk_size: usize,
) -> LookupGenerator {
    info!("producer started");
    let mut batch = Vec::with_capacity(bulk_size);
    for _ in 0..target {
        batch.push(generator.next_lookup());
        if batch.len() == bulk_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(bulk_size));
            if tx.send(full).await.is_err() {
                warn!("producer: channel closed by the loader pool, stopping generation");
                return generator;
            }
        }
    }
    if !batch.is_empty() && tx.send(batch).await.is_err() {
        warn!("producer: channel closed before the final partial batch was flushed");
    }
    info!("producer finished");
    generator
}

/// Loader loop: poll, insert, bump the shared progress counter.
async fn consume(
    name: String,
    rx: BatchReceiver,
    sink: Arc<dyn BackendSink>,
    counter: Arc<AtomicU64>,
    target: u64,
    poll_timeout: Duration,
) -> Result<(), PipelineError> {
    info!("{name}: loader started");
    let interval = progress_interval(target);
    loop {
        match rx.poll(poll_timeout).await {
            Polled::Batch(batch) => {
                let batch_size = batch.len() as u64;
                match sink.insert_batch(&batch).await {
                    Ok(applied) => {
                        let before = counter.fetch_add(applied, Ordering::Relaxed);
                        let after = before + applied;
                        if applied < batch_size {
                            warn!(
                                "{name}: sink applied {applied}/{batch_size} records of a batch"
                            );
                        }
                        if applied > 0 && before / interval != after / interval {
                            info!("{after}/{target} records inserted");
                        }
                    }
                    Err(e) => {
                        let inserted = counter.load(Ordering::Relaxed);
                        error!(
                            "{name}: sink failed on a batch of {batch_size} (inserted so far: {inserted}): {e}"
                        );
                        // Unblock the producer before reporting the failure.
                        rx.close().await;
                        return Err(PipelineError::Sink { inserted, source: e });
                    }
                }
            }
            Polled::Empty => {
                info!(
                    "{name}: waiting, {}/{} records inserted",
                    counter.load(Ordering::Relaxed),
                    target
                );
            }
            Polled::Closed => break,
        }
    }
    info!("{name}: loader finished");
    Ok(())
}

/// Progress is logged whenever the counter crosses a multiple of this.
fn progress_interval(target: u64) -> u64 {
    std::cmp::max(50, target / 100)
}

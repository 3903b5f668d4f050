//! Backend sink contract and transient-failure policy.

use async_trait::async_trait;
use bench_generator::Lookup;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// The unit of transfer across the channel and of backend write.
pub type Batch = Vec<Lookup>;

/// Errors a sink can surface to the pipeline.
///
/// Any error returned from [`BackendSink::insert_batch`] is fatal to the
/// run: retry and drop policies live *inside* each sink implementation, so
/// a sink that absorbs a failure reports it through the applied count
/// instead of an error.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Backend-declared timeout; retriable under a [`TransientPolicy`].
    #[error("transient backend error: {0}")]
    Transient(String),

    /// Duplicate-key or bulk-write conflict.
    #[error("bulk write conflict: {0}")]
    Conflict(String),

    /// Anything else.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Bulk-write endpoint for one backend.
///
/// `insert_batch` either applies the batch (fully, or partially for sinks
/// with a documented drop path) and returns the number of records applied,
/// or fails the run.
#[async_trait]
pub trait BackendSink: Send + Sync {
    async fn insert_batch(&self, batch: &[Lookup]) -> Result<u64, SinkError>;
}

/// Bounded-exponential-backoff retry schedule.
///
/// `max_attempts: None` retries forever, the default for the document-bulk
/// sink; tests and cautious deployments can cap it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Cap the number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Backoff before retry number `attempt` (1-based), doubling up to the
    /// configured maximum.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    fn exhausted(&self, attempts_made: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempts_made >= max)
    }
}

/// What a sink does with a transient failure.
#[derive(Debug, Clone)]
pub enum TransientPolicy {
    /// Surface it to the pipeline (fatal). Default for relational sinks.
    Fail,
    /// Re-attempt the whole batch per the schedule. Default for the
    /// document-bulk sink.
    Retry(RetryPolicy),
}

/// Drive `op` under `policy`, re-attempting whole-batch writes on
/// [`SinkError::Transient`] until success, exhaustion, or a non-transient
/// error.
pub async fn with_transient_retry<F, Fut>(
    policy: &TransientPolicy,
    label: &str,
    mut op: F,
) -> Result<u64, SinkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64, SinkError>>,
{
    let retry = match policy {
        TransientPolicy::Fail => return op().await,
        TransientPolicy::Retry(retry) => retry,
    };

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op().await {
            Err(SinkError::Transient(reason)) if !retry.exhausted(attempts) => {
                let backoff = retry.backoff(attempts);
                warn!(
                    "{label}: transient failure on attempt {attempts}, retrying in {backoff:?}: {reason}"
                );
                tokio::time::sleep(backoff).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let policy = RetryPolicy {
            max_attempts: None,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(300),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(50));
        assert_eq!(policy.backoff(2), Duration::from_millis(100));
        assert_eq!(policy.backoff(3), Duration::from_millis(200));
        assert_eq!(policy.backoff(4), Duration::from_millis(300));
        assert_eq!(policy.backoff(10), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let attempts = AtomicU32::new(0);
        let policy = TransientPolicy::Retry(RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            ..RetryPolicy::default()
        });

        let applied = with_transient_retry(&policy, "test", || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(SinkError::Transient("socket read timed out".into()))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(applied, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_surfaces_transient_error() {
        let attempts = AtomicU32::new(0);
        let policy = TransientPolicy::Retry(
            RetryPolicy {
                initial_backoff: Duration::from_millis(1),
                ..RetryPolicy::default()
            }
            .with_max_attempts(3),
        );

        let result = with_transient_retry(&policy, "test", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<u64, _>(SinkError::Transient("still down".into()))
        })
        .await;

        assert!(matches!(result, Err(SinkError::Transient(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fail_policy_never_retries() {
        let attempts = AtomicU32::new(0);

        let result = with_transient_retry(&TransientPolicy::Fail, "test", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<u64, _>(SinkError::Transient("timed out".into()))
        })
        .await;

        assert!(matches!(result, Err(SinkError::Transient(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let policy = TransientPolicy::Retry(RetryPolicy::default());

        let result = with_transient_retry(&policy, "test", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<u64, _>(SinkError::Conflict("duplicate key".into()))
        })
        .await;

        assert!(matches!(result, Err(SinkError::Conflict(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

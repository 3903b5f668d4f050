//! Bounded batch channel connecting the producer to the loader pool.

use crate::sink::Batch;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Outcome of a timed poll.
#[derive(Debug)]
pub enum Polled {
    /// A batch was available.
    Batch(Batch),
    /// Nothing arrived within the timeout; the caller should re-check and
    /// poll again.
    Empty,
    /// The producer has finished AND the queue has drained; no more batches
    /// will ever arrive.
    Closed,
}

/// Create a bounded channel of batches with the given capacity.
///
/// The capacity is the coordination invariant: the producer can never be
/// more than `capacity` batches ahead of the loaders. Dropping the sender is
/// the producer-finished signal; receivers observe [`Polled::Closed`] only
/// once every enqueued batch has also been consumed.
pub fn batch_channel(capacity: usize) -> (BatchSender, BatchReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        BatchSender { tx },
        BatchReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer handle. Not cloneable: exactly one producer per run.
pub struct BatchSender {
    tx: mpsc::Sender<Batch>,
}

impl BatchSender {
    /// Enqueue a batch, suspending while the channel is full (backpressure).
    ///
    /// Fails only if every receiver is gone or the channel was closed from
    /// the consumer side.
    pub async fn send(&self, batch: Batch) -> Result<(), Batch> {
        self.tx.send(batch).await.map_err(|e| e.0)
    }
}

/// Shared consumer handle for the loader pool.
#[derive(Clone)]
pub struct BatchReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Batch>>>,
}

impl BatchReceiver {
    /// Wait up to `timeout` for a batch.
    pub async fn poll(&self, timeout: Duration) -> Polled {
        let recv = async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        };
        match tokio::time::timeout(timeout, recv).await {
            Ok(Some(batch)) => Polled::Batch(batch),
            Ok(None) => Polled::Closed,
            Err(_) => Polled::Empty,
        }
    }

    /// Close the channel from the consumer side.
    ///
    /// Used when a loader hits a fatal sink error: subsequent producer sends
    /// fail instead of blocking against a dying pool.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn batch_of(n: usize) -> Batch {
        let mut generator = bench_generator::LookupGenerator::new(1);
        (0..n).map(|_| generator.next_lookup()).collect()
    }

    #[tokio::test]
    async fn test_send_blocks_at_capacity() {
        let (tx, _rx) = batch_channel(2);
        let sent = Arc::new(AtomicUsize::new(0));

        let producer = {
            let sent = sent.clone();
            tokio::spawn(async move {
                for _ in 0..5 {
                    if tx.send(batch_of(1)).await.is_err() {
                        break;
                    }
                    sent.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        // Two batches fit; the third send is suspended on backpressure.
        assert_eq!(sent.load(Ordering::SeqCst), 2);
        producer.abort();
    }

    #[tokio::test]
    async fn test_poll_times_out_empty() {
        let (_tx, rx) = batch_channel(2);
        let polled = rx.poll(Duration::from_millis(20)).await;
        assert!(matches!(polled, Polled::Empty));
    }

    #[tokio::test]
    async fn test_closed_only_after_drained() {
        let (tx, rx) = batch_channel(4);
        tx.send(batch_of(3)).await.unwrap();
        drop(tx);

        // The enqueued batch must still come out before Closed.
        match rx.poll(Duration::from_millis(20)).await {
            Polled::Batch(batch) => assert_eq!(batch.len(), 3),
            other => panic!("expected batch, got {other:?}"),
        }
        assert!(matches!(
            rx.poll(Duration::from_millis(20)).await,
            Polled::Closed
        ));
    }

    #[tokio::test]
    async fn test_multiple_consumers_share_the_queue() {
        let (tx, rx) = batch_channel(4);
        for _ in 0..4 {
            tx.send(batch_of(1)).await.unwrap();
        }
        drop(tx);

        let consumed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let rx = rx.clone();
            let consumed = consumed.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    match rx.poll(Duration::from_millis(50)).await {
                        Polled::Batch(_) => {
                            consumed.fetch_add(1, Ordering::SeqCst);
                        }
                        Polled::Empty => continue,
                        Polled::Closed => break,
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(consumed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_consumer_side_close_fails_sender() {
        let (tx, rx) = batch_channel(2);
        rx.close().await;
        assert!(tx.send(batch_of(1)).await.is_err());
    }
}

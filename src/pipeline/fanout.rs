//! Fan-out of pipeline records to independent consumers.
//!
//! Each consumer gets its own bounded queue and thread. The sampling thread
//! never waits on a consumer in the default policy: when a queue is full the
//! oldest queued record is evicted to make room, so a stalled consumer only
//! loses history and never delays acquisition.

use crate::pipeline::PipelineRecord;
use crate::stats::SharedRunStats;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::thread::{self, JoinHandle};

/// A downstream user of pipeline records (log writer, display feed, ...).
///
/// Errors are reported back to the consumer's own thread, logged and
/// counted; they never reach the sampling loop.
pub trait Consumer: Send + 'static {
    fn name(&self) -> &str;

    fn handle(&mut self, record: &PipelineRecord) -> Result<(), ConsumerError>;

    /// Called once after the last record.
    fn finish(&mut self) -> Result<(), ConsumerError> {
        Ok(())
    }
}

/// Failure inside a consumer.
#[derive(Debug)]
pub enum ConsumerError {
    Io(std::io::Error),
    Other(String),
}

impl std::fmt::Display for ConsumerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumerError::Io(e) => write!(f, "IO error: {e}"),
            ConsumerError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConsumerError {}

impl From<std::io::Error> for ConsumerError {
    fn from(e: std::io::Error) -> Self {
        ConsumerError::Io(e)
    }
}

/// A record was discarded because a consumer queue was full. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerOverflow {
    pub consumer: String,
}

impl std::fmt::Display for ConsumerOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "queue for consumer '{}' is full", self.consumer)
    }
}

/// What to do when a consumer queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Evict the oldest queued record (live sampling)
    #[default]
    DropOldest,
    /// Wait for room (offline replay, where nothing is real-time)
    Block,
}

struct Lane {
    name: String,
    tx: Sender<PipelineRecord>,
    /// Second handle on the queue, used to evict the oldest record
    rx: Receiver<PipelineRecord>,
    worker: JoinHandle<()>,
}

/// Distributes every record to all consumers.
pub struct Fanout {
    lanes: Vec<Lane>,
    policy: OverflowPolicy,
    stats: SharedRunStats,
}

impl Fanout {
    /// Spawn one worker thread per consumer.
    pub fn new(
        consumers: Vec<Box<dyn Consumer>>,
        capacity: usize,
        policy: OverflowPolicy,
        stats: SharedRunStats,
    ) -> Self {
        let lanes = consumers
            .into_iter()
            .map(|consumer| spawn_lane(consumer, capacity.max(1), stats.clone()))
            .collect();

        Self {
            lanes,
            policy,
            stats,
        }
    }

    /// Deliver a record to every consumer, reporting any that overflowed.
    pub fn publish(&self, record: &PipelineRecord) -> Vec<ConsumerOverflow> {
        let mut overflows = Vec::new();

        for lane in &self.lanes {
            let delivered = match self.policy {
                OverflowPolicy::Block => lane.tx.send(record.clone()).is_ok(),
                OverflowPolicy::DropOldest => send_evicting(lane, record.clone()),
            };

            if !delivered {
                self.stats.record_dropped();
                tracing::debug!(consumer = %lane.name, "dropped pipeline record");
                overflows.push(ConsumerOverflow {
                    consumer: lane.name.clone(),
                });
            }
        }

        overflows
    }

    /// Close every queue and wait for the consumers to drain it.
    pub fn close(&mut self) {
        for lane in self.lanes.drain(..) {
            let Lane {
                name, tx, worker, ..
            } = lane;
            drop(tx);
            if worker.join().is_err() {
                tracing::warn!(consumer = %name, "consumer thread panicked");
            }
        }
    }
}

impl Drop for Fanout {
    fn drop(&mut self) {
        self.close();
    }
}

/// Non-blocking send; on a full queue evict the oldest record and retry once.
fn send_evicting(lane: &Lane, record: PipelineRecord) -> bool {
    match lane.tx.try_send(record) {
        Ok(()) => true,
        Err(TrySendError::Disconnected(_)) => false,
        Err(TrySendError::Full(record)) => {
            // the evicted record counts as the loss; the new one goes in
            let _ = lane.rx.try_recv();
            let _ = lane.tx.try_send(record);
            false
        }
    }
}

fn spawn_lane(mut consumer: Box<dyn Consumer>, capacity: usize, stats: SharedRunStats) -> Lane {
    let (tx, rx) = bounded::<PipelineRecord>(capacity);
    let name = consumer.name().to_string();
    let worker_rx = rx.clone();

    let worker = thread::spawn(move || {
        for record in worker_rx.iter() {
            if let Err(e) = consumer.handle(&record) {
                stats.record_consumer_error();
                tracing::warn!(consumer = consumer.name(), "consumer failed: {e}");
            }
        }
        if let Err(e) = consumer.finish() {
            stats.record_consumer_error();
            tracing::warn!(consumer = consumer.name(), "consumer failed to finish: {e}");
        }
    });

    Lane {
        name,
        tx,
        rx,
        worker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorRecord;
    use crate::stats::RunStats;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
        gate: Option<crossbeam_channel::Receiver<()>>,
        fail: bool,
    }

    impl Consumer for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn handle(&mut self, record: &PipelineRecord) -> Result<(), ConsumerError> {
            if let Some(gate) = &self.gate {
                let _ = gate.recv();
            }
            if let PipelineRecord::SourceFailure(e) = record {
                self.seen.lock().unwrap().push(e.error.clone());
            }
            if self.fail {
                return Err(ConsumerError::Other("disk full".into()));
            }
            Ok(())
        }
    }

    fn record(tag: &str) -> PipelineRecord {
        PipelineRecord::SourceFailure(ErrorRecord {
            timestamp: Utc::now(),
            error: tag.to_string(),
        })
    }

    #[test]
    fn test_every_consumer_sees_every_record() {
        let stats = Arc::new(RunStats::new());
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));
        let consumers: Vec<Box<dyn Consumer>> = vec![
            Box::new(Recorder {
                seen: a.clone(),
                gate: None,
                fail: false,
            }),
            Box::new(Recorder {
                seen: b.clone(),
                gate: None,
                fail: false,
            }),
        ];

        let mut fanout = Fanout::new(consumers, 16, OverflowPolicy::Block, stats.clone());
        for tag in ["one", "two", "three"] {
            assert!(fanout.publish(&record(tag)).is_empty());
        }
        fanout.close();

        assert_eq!(*a.lock().unwrap(), vec!["one", "two", "three"]);
        assert_eq!(*b.lock().unwrap(), vec!["one", "two", "three"]);
        assert_eq!(stats.snapshot().dropped_records, 0);
    }

    #[test]
    fn test_stalled_consumer_does_not_block_publisher() {
        let stats = Arc::new(RunStats::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let consumers: Vec<Box<dyn Consumer>> = vec![Box::new(Recorder {
            seen: seen.clone(),
            gate: Some(gate_rx),
            fail: false,
        })];

        let mut fanout = Fanout::new(consumers, 2, OverflowPolicy::DropOldest, stats.clone());
        let started = std::time::Instant::now();
        let mut overflowed = 0;
        for i in 0..50 {
            overflowed += fanout.publish(&record(&i.to_string())).len();
        }
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(overflowed > 0);
        assert_eq!(stats.snapshot().dropped_records, overflowed as u64);

        drop(gate_tx);
        fanout.close();

        // the newest record always survives eviction
        assert_eq!(seen.lock().unwrap().last().map(String::as_str), Some("49"));
    }

    #[test]
    fn test_consumer_errors_are_counted_not_propagated() {
        let stats = Arc::new(RunStats::new());
        let consumers: Vec<Box<dyn Consumer>> = vec![Box::new(Recorder {
            seen: Arc::new(Mutex::new(Vec::new())),
            gate: None,
            fail: true,
        })];

        let mut fanout = Fanout::new(consumers, 4, OverflowPolicy::Block, stats.clone());
        fanout.publish(&record("a"));
        fanout.publish(&record("b"));
        fanout.close();

        assert_eq!(stats.snapshot().consumer_errors, 2);
    }
}

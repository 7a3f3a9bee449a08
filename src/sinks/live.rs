//! Bounded history for live displays.
//!
//! A display polls [`LiveView::snapshot`] at its own pace. Only the most
//! recent `capacity` samples and events are retained, so memory stays
//! constant however long the session runs.

use crate::core::MotionEvent;
use crate::pipeline::{Consumer, ConsumerError, ErrorRecord, PipelineRecord, SampleRecord};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Point-in-time copy of the retained history.
#[derive(Debug, Clone, Default)]
pub struct LiveSnapshot {
    pub samples: Vec<SampleRecord>,
    pub events: Vec<MotionEvent>,
    pub last_error: Option<ErrorRecord>,
    pub error_count: u64,
}

impl LiveSnapshot {
    /// Whether the latest sample was inside a debounced motion period.
    pub fn in_motion(&self) -> bool {
        self.samples.last().map_or(false, |s| s.motion)
    }
}

#[derive(Debug)]
struct History {
    capacity: usize,
    samples: VecDeque<SampleRecord>,
    events: VecDeque<MotionEvent>,
    last_error: Option<ErrorRecord>,
    error_count: u64,
}

fn push_bounded<T>(queue: &mut VecDeque<T>, capacity: usize, item: T) {
    if queue.len() == capacity {
        queue.pop_front();
    }
    queue.push_back(item);
}

/// Consumer side: records into the shared history.
pub struct LiveHistory {
    history: Arc<Mutex<History>>,
}

/// Display side: reads the shared history.
#[derive(Clone)]
pub struct LiveView {
    history: Arc<Mutex<History>>,
}

impl LiveHistory {
    /// Create a linked consumer and view retaining `capacity` items of each kind.
    pub fn new(capacity: usize) -> (Self, LiveView) {
        let capacity = capacity.max(1);
        let history = Arc::new(Mutex::new(History {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            events: VecDeque::with_capacity(capacity),
            last_error: None,
            error_count: 0,
        }));
        (
            Self {
                history: history.clone(),
            },
            LiveView { history },
        )
    }
}

fn lock(history: &Mutex<History>) -> MutexGuard<'_, History> {
    match history.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Consumer for LiveHistory {
    fn name(&self) -> &str {
        "live-history"
    }

    fn handle(&mut self, record: &PipelineRecord) -> Result<(), ConsumerError> {
        let mut history = lock(&self.history);
        let capacity = history.capacity;
        match record {
            PipelineRecord::Sample(s) => push_bounded(&mut history.samples, capacity, s.clone()),
            PipelineRecord::Event(e) => push_bounded(&mut history.events, capacity, e.clone()),
            PipelineRecord::SourceFailure(e) => {
                history.last_error = Some(e.clone());
                history.error_count += 1;
            }
        }
        Ok(())
    }
}

impl LiveView {
    pub fn snapshot(&self) -> LiveSnapshot {
        let history = lock(&self.history);
        LiveSnapshot {
            samples: history.samples.iter().cloned().collect(),
            events: history.events.iter().cloned().collect(),
            last_error: history.last_error.clone(),
            error_count: history.error_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(raw_value: u8, motion: bool) -> PipelineRecord {
        PipelineRecord::Sample(SampleRecord {
            timestamp: Utc::now(),
            raw_value,
            short_mean: 0.0,
            short_std: 0.0,
            active: motion,
            level: 0,
            motion,
        })
    }

    #[test]
    fn test_history_is_bounded() {
        let (mut live, view) = LiveHistory::new(3);
        for v in 0..10 {
            live.handle(&sample(v, false)).unwrap();
        }
        let snap = view.snapshot();
        let values: Vec<u8> = snap.samples.iter().map(|s| s.raw_value).collect();
        assert_eq!(values, vec![7, 8, 9]);
    }

    #[test]
    fn test_errors_and_motion() {
        let (mut live, view) = LiveHistory::new(10);
        assert!(!view.snapshot().in_motion());

        live.handle(&sample(40, true)).unwrap();
        live.handle(&PipelineRecord::SourceFailure(ErrorRecord {
            timestamp: Utc::now(),
            error: "boom".into(),
        }))
        .unwrap();

        let snap = view.snapshot();
        assert!(snap.in_motion());
        assert_eq!(snap.error_count, 1);
        assert_eq!(snap.last_error.unwrap().error, "boom");
    }
}

//! Run statistics.
//!
//! Counters are updated from the sampling thread and from consumer threads,
//! so they are plain atomics behind an `Arc`. Totals can be persisted as
//! JSON so `wifi-motion status` can report across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Counters for one monitoring session.
#[derive(Debug)]
pub struct RunStats {
    /// Samples successfully acquired and processed
    samples: AtomicU64,
    /// Failed acquisitions
    source_errors: AtomicU64,
    /// Events closed
    events: AtomicU64,
    /// Records evicted from a full consumer queue
    dropped_records: AtomicU64,
    /// Failures reported by consumers
    consumer_errors: AtomicU64,
    /// Session identifier
    session_id: Uuid,
    /// Machine the session ran on
    host: String,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Totals from earlier sessions
    previous: PersistedStats,
    /// Path for persisting totals
    persist_path: Option<PathBuf>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            samples: AtomicU64::new(0),
            source_errors: AtomicU64::new(0),
            events: AtomicU64::new(0),
            dropped_records: AtomicU64::new(0),
            consumer_errors: AtomicU64::new(0),
            session_id: Uuid::new_v4(),
            host: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            session_start: Utc::now(),
            previous: PersistedStats::default(),
            persist_path: None,
        }
    }

    /// Create run statistics that add to totals stored at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous run statistics: {e}");
        }

        stats
    }

    pub fn record_sample(&self) {
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_error(&self) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_consumer_error(&self) {
        self.consumer_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Current session counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            session_id: self.session_id,
            host: self.host.clone(),
            samples: self.samples.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            dropped_records: self.dropped_records.load(Ordering::Relaxed),
            consumer_errors: self.consumer_errors.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Summary string for display at the end of a run.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session {} on {}:\n\
             - Samples processed: {}\n\
             - Acquisition failures: {}\n\
             - Motion events: {}\n\
             - Records dropped by slow consumers: {}\n\
             - Consumer errors: {}\n\
             - Session duration: {} seconds",
            stats.session_id,
            stats.host,
            stats.samples,
            stats.source_errors,
            stats.events,
            stats.dropped_records,
            stats.consumer_errors,
            stats.session_duration_secs
        )
    }

    /// Save cumulative totals to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                sessions: self.previous.sessions + 1,
                samples: self.previous.samples + stats.samples,
                source_errors: self.previous.source_errors + stats.source_errors,
                events: self.previous.events + stats.events,
                dropped_records: self.previous.dropped_records + stats.dropped_records,
                last_session: Some(stats.session_id),
                last_updated: Some(Utc::now()),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                self.previous = PersistedStats::read(path)?;
            }
        }
        Ok(())
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the current session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub session_id: Uuid,
    pub host: String,
    pub samples: u64,
    pub source_errors: u64,
    pub events: u64,
    pub dropped_records: u64,
    pub consumer_errors: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Cumulative totals across sessions, as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedStats {
    pub sessions: u64,
    pub samples: u64,
    pub source_errors: u64,
    pub events: u64,
    pub dropped_records: u64,
    pub last_session: Option<Uuid>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl PersistedStats {
    /// Read totals written by [`RunStats::save`].
    pub fn read(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }
}

/// Thread-safe shared run statistics.
pub type SharedRunStats = Arc<RunStats>;

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::repo;
use homestead_types::AppError;

/// Maximum samples held in memory before the oldest are discarded.
const DEFAULT_CAPACITY: usize = 1024;

/// How often the background task flushes buffered samples to the database.
pub const FLUSH_INTERVAL_SECS: u64 = 5;

/// One GPS sample waiting to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedPing {
    pub delivery_id: i64,
    pub driver_id: i64,
    pub lat: f64,
    pub lng: f64,
    pub speed_mph: Option<f64>,
    pub heading: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Size-bounded write buffer for GPS samples.
///
/// Driver phones post pings far more often than the trail needs to be
/// durable, and they batch-upload after offline stretches. Samples land
/// here and a background task flushes them every few seconds. When the
/// buffer is full the oldest samples are dropped first — recent positions
/// are worth more than stale ones.
pub struct GpsBuffer {
    inner: Mutex<VecDeque<BufferedPing>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Default for GpsBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl GpsBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Add a sample. Returns true if the buffer is at capacity afterwards,
    /// signalling the caller to trigger an early flush.
    pub fn push(&self, ping: BufferedPing) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.len() >= self.capacity {
            inner.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        inner.push_back(ping);
        inner.len() >= self.capacity
    }

    /// Take every buffered sample, leaving the buffer empty.
    pub fn drain(&self) -> Vec<BufferedPing> {
        let mut inner = self.inner.lock().unwrap();
        inner.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Samples discarded because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Persist every buffered sample. Samples are re-queued on failure so
    /// a transient database outage doesn't lose the trail (subject to the
    /// capacity bound).
    pub async fn flush(&self, pool: &Pool<Postgres>) -> Result<usize, AppError> {
        let batch = self.drain();
        if batch.is_empty() {
            return Ok(0);
        }
        let count = batch.len();

        match repo::gps::insert_pings(pool, &batch).await {
            Ok(()) => Ok(count),
            Err(e) => {
                tracing::warn!(count, %e, "GPS flush failed, re-queueing samples");
                for ping in batch {
                    self.push(ping);
                }
                Err(e)
            }
        }
    }
}

/// Background flush loop. Spawned once at startup.
pub fn spawn_flush_task(pool: Pool<Postgres>, buffer: Arc<GpsBuffer>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(FLUSH_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if !buffer.is_empty() {
                let _ = buffer.flush(&pool).await;
            }
        }
    })
}

//! Time-windowed averaging of processed metric values.
//!
//! Windows close on submission, not on a timer: the flush condition is
//! evaluated right after a value is accumulated, inside the same critical
//! section. A window that receives no traffic therefore stays open until the
//! next value arrives.

use crate::clock::DynClock;
use crate::sample::{ProcessedMetric, PublishedAggregate};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Accumulator state for the window currently open.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationWindow {
    sum: f64,
    count: u64,
    window_start_time: f64,
}

impl AggregationWindow {
    pub fn new(window_start_time: f64) -> Self {
        Self {
            sum: 0.0,
            count: 0,
            window_start_time,
        }
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn window_start_time(&self) -> f64 {
        self.window_start_time
    }

    pub fn accumulate(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn is_due(&self, now: f64, flush_interval: Duration) -> bool {
        now - self.window_start_time >= flush_interval.as_secs_f64()
    }

    /// Close the window and start a fresh one at `now`.
    ///
    /// Returns `None` and leaves the state untouched when nothing has been
    /// accumulated.
    pub fn flush(&mut self, now: f64) -> Option<PublishedAggregate> {
        if self.count == 0 {
            return None;
        }

        let aggregate = PublishedAggregate {
            combined_average: self.sum / self.count as f64,
            timestamp: now,
            sample_count: self.count,
        };
        *self = Self::new(now);
        Some(aggregate)
    }

    /// Accumulate `value`, then flush if the window has been open long enough.
    pub fn submit(
        &mut self,
        value: f64,
        now: f64,
        flush_interval: Duration,
    ) -> Option<PublishedAggregate> {
        self.accumulate(value);
        if self.is_due(now, flush_interval) {
            self.flush(now)
        } else {
            None
        }
    }
}

pub struct WindowedAggregator {
    window: Mutex<AggregationWindow>,
    flush_interval: Duration,
    clock: DynClock,
}

impl WindowedAggregator {
    pub fn new(flush_interval: Duration, clock: DynClock) -> Self {
        let start = clock.now();
        Self {
            window: Mutex::new(AggregationWindow::new(start)),
            flush_interval,
            clock,
        }
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Add one metric to the open window, returning the aggregate if this
    /// submission closed it.
    pub async fn submit(&self, metric: &ProcessedMetric) -> Option<PublishedAggregate> {
        let mut window = self.window.lock().await;
        // Sampled under the lock so window boundaries follow lock order.
        let now = self.clock.now();
        let published = window.submit(metric.value, now, self.flush_interval);

        if let Some(aggregate) = &published {
            debug!(
                "Window closed: {} values, average {:.3}",
                aggregate.sample_count, aggregate.combined_average
            );
        }

        published
    }

    /// Copy of the open window's accumulator.
    pub async fn snapshot(&self) -> AggregationWindow {
        self.window.lock().await.clone()
    }
}

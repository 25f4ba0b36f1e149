//! Frame loop metrics and structured logging.

use crate::stage::TickReport;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Running totals across the ticks of one simulation.
pub struct Metrics {
    tick_count: AtomicU64,
    entity_count: AtomicU64,
    removed_total: AtomicU64,
    spawned_total: AtomicU64,
    dropped_total: AtomicU64,
    busy_micros: AtomicU64,
    log_interval: u64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl Metrics {
    #[must_use]
    pub fn new(log_interval: u64) -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            entity_count: AtomicU64::new(0),
            removed_total: AtomicU64::new(0),
            spawned_total: AtomicU64::new(0),
            dropped_total: AtomicU64::new(0),
            busy_micros: AtomicU64::new(0),
            log_interval: log_interval.max(1),
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Records a completed tick with its duration.
    pub fn record_tick(&self, duration: Duration, report: &TickReport, entities: usize) {
        self.tick_count.fetch_add(1, Ordering::Relaxed);
        self.entity_count.store(entities as u64, Ordering::Relaxed);
        self.removed_total
            .fetch_add(report.removed() as u64, Ordering::Relaxed);
        self.spawned_total
            .fetch_add(report.spawned as u64, Ordering::Relaxed);
        self.dropped_total
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.busy_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if report.dropped > 0 {
            tracing::warn!(tick = report.tick, dropped = report.dropped, "Spawns dropped at capacity");
        }

        let tick = self.tick_count.load(Ordering::Relaxed);
        if tick % self.log_interval == 0 {
            tracing::info!(
                tick = tick,
                entities = entities,
                removed = self.removed_total.load(Ordering::Relaxed),
                spawned = self.spawned_total.load(Ordering::Relaxed),
                dropped = self.dropped_total.load(Ordering::Relaxed),
                duration_us = duration.as_micros() as u64,
                "Simulation tick"
            );
        }
    }

    /// Increments a named counter.
    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn entity_count(&self) -> u64 {
        self.entity_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn removed_total(&self) -> u64 {
        self.removed_total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn spawned_total(&self) -> u64 {
        self.spawned_total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    /// Mean wall time spent per recorded tick.
    #[must_use]
    pub fn mean_tick(&self) -> Duration {
        let ticks = self.tick_count().max(1);
        Duration::from_micros(self.busy_micros.load(Ordering::Relaxed) / ticks)
    }
}

/// Initialize tracing subscriber for logging.
///
/// Honors `RUST_LOG` when set, otherwise logs at INFO.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::default();
        assert_eq!(metrics.tick_count(), 0);
        assert_eq!(metrics.mean_tick(), Duration::ZERO);
    }

    #[test]
    fn test_record_tick_accumulates() {
        let metrics = Metrics::new(10);
        let report = TickReport {
            tick: 1,
            consumed: 2,
            expired: 1,
            spawned: 4,
            dropped: 1,
            ..Default::default()
        };
        metrics.record_tick(Duration::from_millis(16), &report, 100);
        metrics.record_tick(Duration::from_millis(16), &report, 98);
        assert_eq!(metrics.tick_count(), 2);
        assert_eq!(metrics.entity_count(), 98);
        assert_eq!(metrics.removed_total(), 6);
        assert_eq!(metrics.spawned_total(), 8);
        assert_eq!(metrics.dropped_total(), 2);
        assert_eq!(metrics.mean_tick(), Duration::from_millis(16));
    }

    #[test]
    fn test_increment_counter() {
        let metrics = Metrics::default();
        metrics.increment_counter("tool");
        metrics.increment_counter("tool");
        assert_eq!(metrics.counter("tool"), 2);
        assert_eq!(metrics.counter("missing"), 0);
    }
}

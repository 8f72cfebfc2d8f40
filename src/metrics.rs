// src/metrics.rs

//! Operational counters for the engine, reported periodically on the log.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Default)]
pub struct EngineMetrics {
    ticks: AtomicUsize,
    eligible_signals: AtomicUsize,
    mentions: AtomicUsize,
    strikes: AtomicUsize,
    errors: AtomicUsize,
    tick_durations: RwLock<Vec<Duration>>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self, duration: Duration, eligible: usize) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.eligible_signals.fetch_add(eligible, Ordering::Relaxed);
        self.tick_durations.write().push(duration);
    }

    pub fn record_mention(&self) {
        self.mentions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_strike(&self) {
        self.strikes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) {
        let durations = self.tick_durations.read();
        let avg_tick = if durations.is_empty() {
            Duration::ZERO
        } else {
            durations.iter().sum::<Duration>() / durations.len() as u32
        };

        info!(
            "Engine: ticks={}, eligible_signals={}, mentions={}, strikes={}, errors={}, avg_tick={:?}",
            self.ticks.load(Ordering::Relaxed),
            self.eligible_signals.load(Ordering::Relaxed),
            self.mentions.load(Ordering::Relaxed),
            self.strikes.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
            avg_tick,
        );
    }
}

/// Spawn the periodic metrics reporter.
pub fn spawn_reporter(metrics: Arc<EngineMetrics>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);
        interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval_timer.tick().await;
            metrics.report();
        }
    })
}

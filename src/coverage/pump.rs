// src/coverage/pump.rs

//! Coverage pump: the recurring sweep over every registered room.
//!
//! Each tick lazily initializes missing state, runs the gauntlet, forgives
//! one strike per room whose last mention is older than the decay window,
//! and emits a coverage-gap signal for each eligible room. The pump never
//! decides what to broadcast and never delivers anything.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::CoverageConfig;
use crate::metrics::EngineMetrics;
use crate::registry::{DestinationPolicy, DestinationRegistry};

use super::gauntlet;
use super::store::CoverageStore;
use super::types::{CandidateItem, CandidateSource, CoverageGap, CoverageState};

pub struct CoveragePump {
    registry: Arc<DestinationRegistry>,
    store: Arc<CoverageStore>,
    candidates: Arc<dyn CandidateSource>,
    config: CoverageConfig,
    metrics: Arc<EngineMetrics>,
    gap_tx: mpsc::Sender<CoverageGap>,
}

impl CoveragePump {
    pub fn new(
        registry: Arc<DestinationRegistry>,
        store: Arc<CoverageStore>,
        candidates: Arc<dyn CandidateSource>,
        config: CoverageConfig,
        metrics: Arc<EngineMetrics>,
        gap_tx: mpsc::Sender<CoverageGap>,
    ) -> Self {
        Self {
            registry,
            store,
            candidates,
            config,
            metrics,
            gap_tx,
        }
    }

    /// Start the interval loop. Ticks never overlap; a slow tick simply
    /// delays the next one.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.config.pump_interval;

        tokio::spawn(async move {
            info!("Coverage pump started (interval: {:?})", interval);

            let mut interval_timer = time::interval(interval);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval_timer.tick().await;
                self.run_once(Utc::now()).await;
            }
        })
    }

    /// One full sweep at `now`. Returns how many rooms came up eligible.
    /// Per-room failures are logged and do not abort the sweep.
    pub async fn run_once(&self, now: DateTime<Utc>) -> usize {
        let start = Instant::now();
        let candidates = self.candidates.candidates().await;
        let mut eligible = 0;

        for policy in self.registry.all() {
            match self.process_destination(policy, &candidates, now).await {
                Ok(true) => eligible += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Coverage check failed for '{}': {:#}", policy.id, e);
                    self.metrics.record_error();
                }
            }
        }

        let duration = start.elapsed();
        self.metrics.record_tick(duration, eligible);
        if eligible > 0 {
            info!(
                "Coverage tick: {}/{} rooms eligible in {:?}",
                eligible,
                self.registry.len(),
                duration
            );
        }
        eligible
    }

    /// Returns whether the room was eligible this tick.
    async fn process_destination(
        &self,
        policy: &DestinationPolicy,
        candidates: &[CandidateItem],
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let lock = self.store.lock(&policy.id).await;
        let _guard = lock.lock().await;

        let state = match self.store.get(&policy.id).await {
            Some(state) => state,
            None => {
                let fresh = CoverageState::seeded(policy, self.config.default_cadence_ms);
                self.store.put(&fresh).await?;
                debug!("Initialized coverage state for '{}'", policy.id);
                fresh
            }
        };

        let verdict = gauntlet::evaluate(&state, candidates, now, &self.config);

        // Opportunistic strike decay, gated on mention recency: a room only
        // earns forgiveness once it has gone quiet for the decay window
        // after its last broadcast. Rooms that never broadcast keep their
        // strikes.
        if state.strikes > 0 {
            if let Some(last_mention) = state.last_mention_at {
                let quiet_for = now - last_mention;
                if quiet_for > Duration::milliseconds(self.config.strike_decay_window_ms) {
                    let mut decayed = state.clone();
                    decayed.strikes -= 1;
                    self.store.put(&decayed).await?;
                    debug!(
                        "Decayed one strike for '{}' ({} remaining)",
                        policy.id, decayed.strikes
                    );
                }
            }
        }

        if verdict.is_eligible() {
            let gap = CoverageGap {
                destination_id: policy.id.clone(),
            };
            if let Err(e) = self.gap_tx.send(gap).await {
                warn!("No consumer for coverage gap signal: {}", e);
            }
            return Ok(true);
        }

        debug!("Room '{}' ineligible: {:?}", policy.id, verdict);
        Ok(false)
    }
}

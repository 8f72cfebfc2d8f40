// src/engine.rs

//! Service assembly: one `CoverageEngine` owns the registry, the state
//! store, and both write paths, and exposes the external surface (event
//! sinks, the read accessor, and the pump spawner).

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::CoverageConfig;
use crate::coverage::mention::MentionRecorder;
use crate::coverage::pump::CoveragePump;
use crate::coverage::store::{CoverageBackend, CoverageStore};
use crate::coverage::strikes::StrikeManager;
use crate::coverage::types::{CandidateSource, CoverageGap, CoverageState};
use crate::metrics::EngineMetrics;
use crate::registry::DestinationRegistry;

pub struct CoverageEngine {
    config: CoverageConfig,
    registry: Arc<DestinationRegistry>,
    store: Arc<CoverageStore>,
    mentions: MentionRecorder,
    strikes: StrikeManager,
    metrics: Arc<EngineMetrics>,
}

impl CoverageEngine {
    pub fn new(
        config: CoverageConfig,
        registry: Arc<DestinationRegistry>,
        backend: Arc<dyn CoverageBackend>,
    ) -> Self {
        let store = Arc::new(CoverageStore::new(backend));
        let mentions = MentionRecorder::new(registry.clone(), store.clone(), config.clone());
        let strikes = StrikeManager::new(registry.clone(), store.clone(), config.clone());

        Self {
            config,
            registry,
            store,
            mentions,
            strikes,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Load persisted coverage records into the cache. Call once at startup.
    pub async fn hydrate(&self) -> Result<usize> {
        self.store.hydrate().await
    }

    /// "Broadcast happened" event sink.
    pub async fn record_mention(&self, destination_id: &str, at: DateTime<Utc>) -> Result<()> {
        if self.mentions.record_mention(destination_id, at).await? {
            self.metrics.record_mention();
        }
        Ok(())
    }

    /// "Feedback received" event sink; classification happens inside.
    pub async fn record_feedback(
        &self,
        destination_id: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if self.strikes.record_feedback(destination_id, text, at).await? {
            self.metrics.record_strike();
        }
        Ok(())
    }

    /// Read accessor for inspection and reporting.
    pub async fn coverage_state(&self, destination_id: &str) -> Option<CoverageState> {
        self.store.get(destination_id).await
    }

    pub fn is_registered(&self, destination_id: &str) -> bool {
        self.registry.contains(destination_id)
    }

    pub fn registry(&self) -> &DestinationRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }

    /// Start the coverage pump; eligible rooms stream out on `gap_tx`.
    pub fn spawn_pump(
        &self,
        candidates: Arc<dyn CandidateSource>,
        gap_tx: mpsc::Sender<CoverageGap>,
    ) -> JoinHandle<()> {
        let pump = Arc::new(CoveragePump::new(
            self.registry.clone(),
            self.store.clone(),
            candidates,
            self.config.clone(),
            self.metrics.clone(),
            gap_tx,
        ));
        pump.spawn()
    }

    /// Build a pump without starting its timer. Driven manually via
    /// `CoveragePump::run_once`.
    pub fn build_pump(
        &self,
        candidates: Arc<dyn CandidateSource>,
        gap_tx: mpsc::Sender<CoverageGap>,
    ) -> CoveragePump {
        CoveragePump::new(
            self.registry.clone(),
            self.store.clone(),
            candidates,
            self.config.clone(),
            self.metrics.clone(),
            gap_tx,
        )
    }
}

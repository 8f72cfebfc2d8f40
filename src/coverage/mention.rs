// src/coverage/mention.rs

//! Mention recorder: the "broadcast happened" write path.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::CoverageConfig;
use crate::registry::DestinationRegistry;

use super::store::CoverageStore;
use super::types::{CoverageState, DAILY_WINDOW_MS};

pub struct MentionRecorder {
    registry: Arc<DestinationRegistry>,
    store: Arc<CoverageStore>,
    config: CoverageConfig,
}

impl MentionRecorder {
    pub fn new(
        registry: Arc<DestinationRegistry>,
        store: Arc<CoverageStore>,
        config: CoverageConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    /// Attribute a broadcast to the room's current 24h window.
    ///
    /// Unknown rooms are silently ignored: events arrive from a general
    /// message stream, most of which is irrelevant.
    ///
    /// The staleness check compares `now` against the *previous*
    /// `last_mention_at`, and resets the counter to 1 rather than
    /// recomputing a window. Mentions clustered near the 24h boundary can
    /// therefore keep a count spanning more than a strict sliding window
    /// would. That is the contract, not a bug to fix here.
    ///
    /// Returns whether a state update happened.
    pub async fn record_mention(&self, destination_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let Some(policy) = self.registry.get(destination_id) else {
            debug!("Ignoring mention for unregistered destination '{}'", destination_id);
            return Ok(false);
        };

        let lock = self.store.lock(destination_id).await;
        let _guard = lock.lock().await;

        let mut state = match self.store.get(destination_id).await {
            Some(state) => state,
            None => CoverageState::seeded(policy, self.config.default_cadence_ms),
        };

        let previous = state.last_mention_at;
        state.last_mention_at = Some(now);
        state.mention_count_24h = match previous {
            Some(prev) if (now - prev).num_milliseconds() <= DAILY_WINDOW_MS => {
                state.mention_count_24h + 1
            }
            // First mention ever, or the previous one went stale.
            _ => 1,
        };

        self.store.put(&state).await?;
        debug!(
            "Recorded mention for '{}' (count_24h={})",
            destination_id, state.mention_count_24h
        );
        Ok(true)
    }
}

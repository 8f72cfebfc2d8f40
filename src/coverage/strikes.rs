// src/coverage/strikes.rs

//! Strike manager: classifies negative feedback and applies the mute
//! threshold. Strike decay does not live here; the pump forgives strikes
//! opportunistically based on mention recency.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::CoverageConfig;
use crate::registry::DestinationRegistry;

use super::store::CoverageStore;
use super::types::CoverageState;

/// Phrases that count as "stop posting here". Substring containment on the
/// lower-cased text, no tokenization. Deliberately cheap and approximate;
/// false positives are an accepted trade-off.
const NEGATIVE_PHRASES: &[&str] = &[
    "stop",
    "enough",
    "too much",
    "spam",
    "annoying",
    "shut up",
    "quiet",
    "mute",
    "don't care",
    "not interested",
];

/// True when the feedback text reads as a request to back off.
pub fn classify_feedback(text: &str) -> bool {
    let lowered = text.to_lowercase();
    NEGATIVE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

pub struct StrikeManager {
    registry: Arc<DestinationRegistry>,
    store: Arc<CoverageStore>,
    config: CoverageConfig,
}

impl StrikeManager {
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

    /// Classify feedback text and record a strike if it is negative.
    /// Returns whether a strike was recorded.
    pub async fn record_feedback(
        &self,
        destination_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if !classify_feedback(text) {
            debug!("Feedback for '{}' not negative, ignoring", destination_id);
            return Ok(false);
        }
        self.record_strike(destination_id, now).await
    }

    /// Count one strike. At or above the threshold the room is muted, and
    /// every further strike restarts the mute clock from `now`; repeated
    /// pushback keeps extending the block.
    ///
    /// Returns whether a state update happened.
    pub async fn record_strike(&self, destination_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let Some(policy) = self.registry.get(destination_id) else {
            debug!("Ignoring strike for unregistered destination '{}'", destination_id);
            return Ok(false);
        };

        let lock = self.store.lock(destination_id).await;
        let _guard = lock.lock().await;

        let mut state = match self.store.get(destination_id).await {
            Some(state) => state,
            None => CoverageState::seeded(policy, self.config.default_cadence_ms),
        };

        state.strikes += 1;

        if state.strikes >= self.config.strike_mute_threshold {
            let muted_until = now + Duration::milliseconds(self.config.mute_duration_ms);
            state.muted_until = Some(muted_until);
            warn!(
                "Destination '{}' muted until {} ({} strikes)",
                destination_id, muted_until, state.strikes
            );
        }

        self.store.put(&state).await?;
        debug!("Recorded strike for '{}' (strikes={})", destination_id, state.strikes);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_matches_phrases() {
        assert!(classify_feedback("please STOP posting this"));
        assert!(classify_feedback("this is spam"));
        assert!(classify_feedback("Enough already"));
        assert!(classify_feedback("honestly I don't care"));
        assert!(classify_feedback("we get it, Too Much of this"));
    }

    #[test]
    fn classifier_is_substring_based() {
        // "unstoppable" contains "stop", an accepted false positive
        assert!(classify_feedback("this bot is unstoppable"));
    }

    #[test]
    fn classifier_passes_neutral_text() {
        assert!(!classify_feedback("great update, thanks"));
        assert!(!classify_feedback("what happened next?"));
        assert!(!classify_feedback(""));
    }
}

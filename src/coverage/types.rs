// src/coverage/types.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::DestinationPolicy;

/// The 24-hour accounting window for mention counts and the daily cap.
/// This is fixed semantics, not a tunable.
pub(crate) const DAILY_WINDOW_MS: i64 = 86_400_000;

/// Per-room coverage record. Created lazily on the first event or pump tick
/// that touches the room, never deleted; it decays toward an unmuted,
/// low-strike state over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageState {
    pub destination_id: String,
    pub room_name: String,
    pub platform: String,

    /// Most recent permitted broadcast. Unset until the first mention.
    pub last_mention_at: Option<DateTime<Utc>>,

    /// Broadcasts attributed to the current 24h window. Reset-on-stale,
    /// not a sliding window.
    pub mention_count_24h: u32,

    /// Effective cadence for this room (policy override or global default).
    /// Always strictly positive.
    pub cadence_ms: i64,

    pub strikes: u32,

    /// When set and in the future, the room is hard-blocked.
    pub muted_until: Option<DateTime<Utc>>,

    // Reserved for the topic-inference and idle-tracking features.
    // Persisted, never consumed by any decision here.
    pub inferred_topics: Option<String>,
    pub idle_since: Option<DateTime<Utc>>,
}

impl CoverageState {
    /// Fresh record for a room with no history, seeded from its policy.
    pub fn seeded(policy: &DestinationPolicy, default_cadence_ms: i64) -> Self {
        Self {
            destination_id: policy.id.clone(),
            room_name: policy.room_name.clone(),
            platform: policy.platform.clone(),
            last_mention_at: None,
            mention_count_24h: 0,
            cadence_ms: policy.cadence_override_ms.unwrap_or(default_cadence_ms),
            strikes: 0,
            muted_until: None,
            inferred_topics: None,
            idle_since: None,
        }
    }
}

/// Why a room is not currently eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    /// Hard-blocked by accumulated strikes. Absolute; nothing overrides it.
    Muted,
    /// The daily mention cap is exhausted for the current window.
    Capped,
    /// The cadence gap has not elapsed yet.
    TooSoon,
}

/// Outcome of one gauntlet evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    Ineligible(IneligibleReason),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Momentum {
    Growing,
    Stable,
    Fading,
}

/// Opaque candidate item from the selection component. Only momentum and
/// confidence matter here; everything else about the item is none of our
/// business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateItem {
    pub momentum: Momentum,
    pub confidence: f64,
}

/// Source of candidate items, supplied by the excluded selection component.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn candidates(&self) -> Vec<CandidateItem>;
}

/// A room that passed the gauntlet this tick and awaits a broadcast
/// decision. Emitted once per tick per eligible room, never deduplicated
/// across ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageGap {
    pub destination_id: String,
}

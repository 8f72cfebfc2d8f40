// src/coverage/gauntlet.rs

//! The safeguard gauntlet: the ordered eligibility checks. Pure function;
//! state, candidates, clock, and config in, verdict out.
//!
//! Order is load-bearing and each check short-circuits:
//!   1. mute:      community-expressed refusal is absolute
//!   2. daily cap: a hard volume ceiling independent of content
//!   3. cadence:   default pacing; the only check the breaking override
//!                 may waive
//!
//! Urgency compresses pacing and nothing else.

use chrono::{DateTime, Utc};

use crate::config::CoverageConfig;

use super::types::{
    CandidateItem, CoverageState, DAILY_WINDOW_MS, IneligibleReason, Momentum, Verdict,
};

pub fn evaluate(
    state: &CoverageState,
    candidates: &[CandidateItem],
    now: DateTime<Utc>,
    config: &CoverageConfig,
) -> Verdict {
    // 1. Mute: absolute priority.
    if let Some(muted_until) = state.muted_until {
        if now < muted_until {
            return Verdict::Ineligible(IneligibleReason::Muted);
        }
    }

    if let Some(last_mention) = state.last_mention_at {
        let gap_ms = (now - last_mention).num_milliseconds();

        // 2. Daily cap, counted against the current (reset-on-stale) window.
        if gap_ms < DAILY_WINDOW_MS && state.mention_count_24h >= config.daily_mention_cap {
            return Verdict::Ineligible(IneligibleReason::Capped);
        }

        // 3. Cadence, unless a breaking candidate waives it.
        if gap_ms < state.cadence_ms && !breaking_override(candidates, config) {
            return Verdict::Ineligible(IneligibleReason::TooSoon);
        }
    }

    Verdict::Eligible
}

/// A rising, high-confidence candidate may compress cadence, never the
/// mute or the cap.
fn breaking_override(candidates: &[CandidateItem], config: &CoverageConfig) -> bool {
    config.breaking_override_enabled
        && candidates.iter().any(|item| {
            item.momentum == Momentum::Growing && item.confidence > config.breaking_confidence_min
        })
}

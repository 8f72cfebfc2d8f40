// src/config/mod.rs
// Engine configuration: every knob has a stated default, loaded once,
// validated once, passed explicitly. Never re-read per call.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Fatal configuration problem. The engine must not start with one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("default cadence must be strictly positive (got {0} ms)")]
    NonPositiveCadence(i64),
    #[error("daily mention cap must be at least 1")]
    ZeroDailyCap,
    #[error("mute duration must be strictly positive (got {0} ms)")]
    NonPositiveMuteDuration(i64),
    #[error("strike mute threshold must be at least 1")]
    ZeroStrikeThreshold,
    #[error("strike decay window must be strictly positive (got {0} ms)")]
    NonPositiveDecayWindow(i64),
    #[error("pump interval must be strictly positive")]
    ZeroPumpInterval,
}

/// Tunables for the coverage safeguard engine.
#[derive(Debug, Clone)]
pub struct CoverageConfig {
    /// Minimum gap between two permitted broadcasts to the same room,
    /// unless the room's policy overrides it.
    pub default_cadence_ms: i64,

    /// Maximum broadcasts attributed to a room's current 24h window.
    pub daily_mention_cap: u32,

    /// How long a room stays hard-blocked once the strike threshold is hit.
    pub mute_duration_ms: i64,

    /// Strike count at which the mute kicks in.
    pub strike_mute_threshold: u32,

    /// Mention-recency window after which one strike is forgiven per tick.
    pub strike_decay_window_ms: i64,

    /// Time between coverage pump ticks.
    pub pump_interval: Duration,

    /// Whether a hot candidate item may compress cadence.
    pub breaking_override_enabled: bool,

    /// Confidence a candidate must exceed for the breaking override.
    pub breaking_confidence_min: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            default_cadence_ms: 7_200_000,       // 2 hours
            daily_mention_cap: 15,
            mute_duration_ms: 86_400_000,        // 24 hours
            strike_mute_threshold: 2,
            strike_decay_window_ms: 172_800_000, // 48 hours
            pump_interval: Duration::from_secs(1800),
            breaking_override_enabled: true,
            breaking_confidence_min: 0.8,
        }
    }
}

/// Parse an env var, trimming whitespace and trailing comments,
/// falling back to the default on absence or parse failure.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    tracing::warn!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl CoverageConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_cadence_ms: env_var_or("HERALD_DEFAULT_CADENCE_MS", defaults.default_cadence_ms),
            daily_mention_cap: env_var_or("HERALD_DAILY_MENTION_CAP", defaults.daily_mention_cap),
            mute_duration_ms: env_var_or("HERALD_MUTE_DURATION_MS", defaults.mute_duration_ms),
            strike_mute_threshold: env_var_or(
                "HERALD_STRIKE_MUTE_THRESHOLD",
                defaults.strike_mute_threshold,
            ),
            strike_decay_window_ms: env_var_or(
                "HERALD_STRIKE_DECAY_WINDOW_MS",
                defaults.strike_decay_window_ms,
            ),
            pump_interval: Duration::from_secs(env_var_or(
                "HERALD_PUMP_INTERVAL_SECS",
                defaults.pump_interval.as_secs(),
            )),
            breaking_override_enabled: env_var_or(
                "HERALD_BREAKING_OVERRIDE",
                defaults.breaking_override_enabled,
            ),
            breaking_confidence_min: env_var_or(
                "HERALD_BREAKING_CONFIDENCE_MIN",
                defaults.breaking_confidence_min,
            ),
        }
    }

    /// One-shot validation at load time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_cadence_ms <= 0 {
            return Err(ConfigError::NonPositiveCadence(self.default_cadence_ms));
        }
        if self.daily_mention_cap == 0 {
            return Err(ConfigError::ZeroDailyCap);
        }
        if self.mute_duration_ms <= 0 {
            return Err(ConfigError::NonPositiveMuteDuration(self.mute_duration_ms));
        }
        if self.strike_mute_threshold == 0 {
            return Err(ConfigError::ZeroStrikeThreshold);
        }
        if self.strike_decay_window_ms <= 0 {
            return Err(ConfigError::NonPositiveDecayWindow(self.strike_decay_window_ms));
        }
        if self.pump_interval.is_zero() {
            return Err(ConfigError::ZeroPumpInterval);
        }
        Ok(())
    }

    /// Human-readable summary for the startup log.
    pub fn summary(&self) -> String {
        format!(
            "Coverage Config:\n\
            - Default cadence: {} min\n\
            - Daily cap: {} mentions\n\
            - Mute: {} strikes -> {} hours\n\
            - Strike decay window: {} hours\n\
            - Pump interval: {} min\n\
            - Breaking override: {} (confidence > {})",
            self.default_cadence_ms / 60_000,
            self.daily_mention_cap,
            self.strike_mute_threshold,
            self.mute_duration_ms / 3_600_000,
            self.strike_decay_window_ms / 3_600_000,
            self.pump_interval.as_secs() / 60,
            if self.breaking_override_enabled { "ON" } else { "OFF" },
            self.breaking_confidence_min,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CoverageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.daily_mention_cap, 15);
        assert_eq!(config.mute_duration_ms, 86_400_000);
        assert_eq!(config.strike_mute_threshold, 2);
    }

    #[test]
    fn rejects_non_positive_cadence() {
        let config = CoverageConfig {
            default_cadence_ms: 0,
            ..CoverageConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveCadence(0))
        ));
    }

    #[test]
    fn rejects_zero_pump_interval() {
        let config = CoverageConfig {
            pump_interval: Duration::ZERO,
            ..CoverageConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPumpInterval)));
    }

    #[test]
    fn summary_mentions_cap_and_cadence() {
        let summary = CoverageConfig::default().summary();
        assert!(summary.contains("120 min"));
        assert!(summary.contains("15 mentions"));
    }
}

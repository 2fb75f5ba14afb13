//! Tunable gameplay constants
//!
//! Every radius, timer and reward amount the core uses lives in
//! [`GameConfig`]. Defaults match the shipped game; a JSON document with
//! any subset of fields can override them.

use crate::error::{GameError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reward rules applied to a progression record on each capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    /// Experience granted per confirmed capture
    pub xp_per_capture: u64,
    /// Level-up threshold is `level * xp_per_level`
    pub xp_per_level: u64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            xp_per_capture: 50,
            xp_per_level: 100,
        }
    }
}

/// Location provider settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationOptions {
    /// Request GPS-grade accuracy
    pub high_accuracy: bool,
    /// Minimum movement before the provider reports a new sample
    pub distance_filter_meters: f64,
    /// Minimum interval between samples
    pub min_interval_ms: u64,
    /// Timeout for a one-shot fix
    pub timeout_ms: u64,
    /// Timeout for the relaxed retry after a timed-out fix
    pub retry_timeout_ms: u64,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            distance_filter_meters: 10.0,
            min_interval_ms: 5_000,
            timeout_ms: 20_000,
            retry_timeout_ms: 30_000,
        }
    }
}

impl LocationOptions {
    /// Options for the single retry after a timeout
    pub fn relaxed(&self) -> Self {
        Self {
            high_accuracy: false,
            timeout_ms: self.retry_timeout_ms,
            ..*self
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level configuration for the spawn and capture core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Distance within which a spawn is enterable
    pub capture_radius_meters: f64,
    /// Half-width of the square spawns are scattered in around the anchor
    pub spawn_radius_meters: f64,
    /// Movement below this does not count as leaving the settled spot
    pub settle_threshold_meters: f64,
    /// Settled time after which spawns are regenerated automatically
    pub idle_regeneration_secs: u64,
    /// Period of the idle check timer
    pub idle_check_interval_secs: u64,
    /// Creatures fetched per spawn wave
    pub batch_size: usize,
    /// Batch offsets are drawn from `0..max_batch_offset`
    pub max_batch_offset: usize,
    pub location: LocationOptions,
    /// Age after which a cached fix is no longer used as a fallback
    pub location_cache_ttl_secs: u64,
    /// Lifetime of a cached creature batch
    pub creature_cache_ttl_secs: u64,
    pub reward: RewardPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            capture_radius_meters: 10.0,
            spawn_radius_meters: 50.0,
            settle_threshold_meters: 10.0,
            idle_regeneration_secs: 300,
            idle_check_interval_secs: 60,
            batch_size: 3,
            max_batch_offset: 148,
            location: LocationOptions::default(),
            location_cache_ttl_secs: 300,
            creature_cache_ttl_secs: 24 * 60 * 60,
            reward: RewardPolicy::default(),
        }
    }
}

impl GameConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable
    pub fn validate(&self) -> Result<()> {
        let radii = [
            ("capture_radius_meters", self.capture_radius_meters),
            ("spawn_radius_meters", self.spawn_radius_meters),
            ("settle_threshold_meters", self.settle_threshold_meters),
            (
                "location.distance_filter_meters",
                self.location.distance_filter_meters,
            ),
        ];
        for (name, value) in radii {
            if !value.is_finite() || value < 0.0 {
                return Err(GameError::Config(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }

        if self.batch_size == 0 {
            return Err(GameError::Config("batch_size must be at least 1".into()));
        }

        let durations = [
            ("idle_regeneration_secs", self.idle_regeneration_secs),
            ("idle_check_interval_secs", self.idle_check_interval_secs),
            ("location_cache_ttl_secs", self.location_cache_ttl_secs),
            ("creature_cache_ttl_secs", self.creature_cache_ttl_secs),
            ("location.timeout_ms", self.location.timeout_ms),
            ("location.retry_timeout_ms", self.location.retry_timeout_ms),
        ];
        for (name, value) in durations {
            if value == 0 {
                return Err(GameError::Config(format!("{name} must be non-zero")));
            }
        }

        if self.reward.xp_per_level == 0 {
            return Err(GameError::Config(
                "reward.xp_per_level must be non-zero".into(),
            ));
        }

        Ok(())
    }

    pub fn with_capture_radius(mut self, meters: f64) -> Self {
        self.capture_radius_meters = meters;
        self
    }

    pub fn with_spawn_radius(mut self, meters: f64) -> Self {
        self.spawn_radius_meters = meters;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_idle_regeneration(mut self, after: Duration) -> Self {
        self.idle_regeneration_secs = after.as_secs();
        self
    }

    pub fn with_idle_check_interval(mut self, every: Duration) -> Self {
        self.idle_check_interval_secs = every.as_secs();
        self
    }

    pub fn idle_regeneration_after(&self) -> Duration {
        Duration::from_secs(self.idle_regeneration_secs)
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_secs(self.idle_check_interval_secs)
    }

    pub fn location_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.location_cache_ttl_secs)
    }

    pub fn creature_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.creature_cache_ttl_secs)
    }
}

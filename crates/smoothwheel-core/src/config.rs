//! Tunable engine parameters.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::warn;

/// Allowed range for [`EngineConfig::smoothing_factor`].
pub const SMOOTHING_RANGE: RangeInclusive<f64> = 0.1..=1.0;

/// Allowed range for [`EngineConfig::scroll_multiplier`].
pub const MULTIPLIER_RANGE: RangeInclusive<f64> = 0.5..=3.0;

/// Snapshot of everything the host can tune.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether the tap should be installed at all.
    pub is_enabled: bool,
    /// EMA weight of the newest sample. Lower is smoother, higher is more responsive.
    pub smoothing_factor: f64,
    /// Output gain applied after smoothing.
    pub scroll_multiplier: f64,
    /// Keep scrolling after real input stops.
    pub enable_inertia: bool,
    pub invert_scroll: bool,
    /// Also filter continuous (trackpad) scrolling.
    pub process_all_scroll_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            is_enabled: true,
            smoothing_factor: 0.3,
            scroll_multiplier: 1.0,
            enable_inertia: true,
            invert_scroll: false,
            process_all_scroll_events: false,
        }
    }
}

impl EngineConfig {
    /// Return a copy with both ranged fields forced into range.
    pub fn clamped(mut self) -> Self {
        self.smoothing_factor =
            clamp_field("smoothing_factor", self.smoothing_factor, SMOOTHING_RANGE);
        self.scroll_multiplier = clamp_field(
            "scroll_multiplier",
            self.scroll_multiplier,
            MULTIPLIER_RANGE,
        );
        self
    }
}

/// Clamp `value` into `range`, falling back to the lower bound for NaN.
pub(crate) fn clamp_field(name: &str, value: f64, range: RangeInclusive<f64>) -> f64 {
    let (lo, hi) = (*range.start(), *range.end());
    if value.is_nan() {
        warn!(field = name, "NaN config value, using {}", lo);
        return lo;
    }
    let clamped = value.clamp(lo, hi);
    if clamped != value {
        warn!(field = name, value, clamped, "config value out of range, clamped");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.is_enabled);
        assert_eq!(config.smoothing_factor, 0.3);
        assert_eq!(config.scroll_multiplier, 1.0);
        assert!(config.enable_inertia);
        assert!(!config.invert_scroll);
        assert!(!config.process_all_scroll_events);
    }

    #[test]
    fn test_clamped() {
        let config = EngineConfig {
            smoothing_factor: 0.0,
            scroll_multiplier: 7.5,
            ..EngineConfig::default()
        }
        .clamped();
        assert_eq!(config.smoothing_factor, 0.1);
        assert_eq!(config.scroll_multiplier, 3.0);

        let config = EngineConfig {
            smoothing_factor: f64::NAN,
            ..EngineConfig::default()
        }
        .clamped();
        assert_eq!(config.smoothing_factor, 0.1);
    }

    #[test]
    fn test_in_range_untouched() {
        let config = EngineConfig {
            smoothing_factor: 0.75,
            scroll_multiplier: 2.0,
            ..EngineConfig::default()
        };
        assert_eq!(config.clamped(), config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: EngineConfig = serde_yaml::from_str("invert_scroll: true\n").unwrap();
        assert!(config.invert_scroll);
        assert_eq!(config.smoothing_factor, 0.3);
        assert!(config.is_enabled);
    }
}

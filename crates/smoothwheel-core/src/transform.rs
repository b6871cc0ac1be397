//! Scroll transformer: inversion, EMA smoothing and pixel scaling.

use crate::EngineConfig;

/// Wheel "line" units to pixel units.
pub const PIXEL_SCALE: f64 = 10.0;

/// Raw per-axis magnitude above which a sample (re)starts inertia.
pub const INERTIA_SEED_THRESHOLD: f64 = 0.5;

/// One raw scroll observation from the hook.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollSample {
    pub delta_y: f64,
    pub delta_x: f64,
    /// Trackpad-style input, as flagged by the OS.
    pub is_continuous: bool,
}

impl ScrollSample {
    /// Discrete wheel sample.
    pub fn wheel(delta_y: f64, delta_x: f64) -> Self {
        Self {
            delta_y,
            delta_x,
            is_continuous: false,
        }
    }

    /// Continuous (trackpad) sample.
    pub fn continuous(delta_y: f64, delta_x: f64) -> Self {
        Self {
            delta_y,
            delta_x,
            is_continuous: true,
        }
    }
}

/// Exponentially smoothed scroll velocity, in wheel units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityState {
    pub y: f64,
    pub x: f64,
}

impl VelocityState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_zero(&self) -> bool {
        self.y == 0.0 && self.x == 0.0
    }

    /// Scale to whole pixels. Truncates toward zero.
    pub fn to_pixels(&self, multiplier: f64) -> PixelDelta {
        PixelDelta {
            y: (self.y * multiplier * PIXEL_SCALE) as i32,
            x: (self.x * multiplier * PIXEL_SCALE) as i32,
        }
    }
}

/// Two-axis pixel delta carried by a synthesized scroll event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelDelta {
    pub y: i32,
    pub x: i32,
}

/// Outcome of running one sample through the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Leave the original event alone.
    PassThrough,
    /// Replace the original with a pixel event carrying `delta`.
    Replace {
        delta: PixelDelta,
        /// The raw sample was large enough to (re)start inertia.
        seed_inertia: bool,
    },
}

/// Run one sample through the filter, updating `velocity` in place.
///
/// Continuous input is skipped unless `process_all_scroll_events` is set, and then
/// `velocity` is not touched. A zero delta still runs the EMA and decays velocity.
pub fn transform(
    sample: &ScrollSample,
    config: &EngineConfig,
    velocity: &mut VelocityState,
) -> Transform {
    if sample.is_continuous && !config.process_all_scroll_events {
        return Transform::PassThrough;
    }

    let (mut dy, mut dx) = (sample.delta_y, sample.delta_x);
    if config.invert_scroll {
        dy = -dy;
        dx = -dx;
    }

    let a = config.smoothing_factor;
    velocity.y = velocity.y * (1.0 - a) + dy * a;
    velocity.x = velocity.x * (1.0 - a) + dx * a;

    let seed_inertia = config.enable_inertia
        && (dy.abs() > INERTIA_SEED_THRESHOLD || dx.abs() > INERTIA_SEED_THRESHOLD);

    Transform::Replace {
        delta: velocity.to_pixels(config.scroll_multiplier),
        seed_inertia,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(smoothing: f64) -> EngineConfig {
        EngineConfig {
            smoothing_factor: smoothing,
            ..EngineConfig::default()
        }
    }

    fn seeds(out: Transform) -> bool {
        match out {
            Transform::Replace { seed_inertia, .. } => seed_inertia,
            Transform::PassThrough => false,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let cfg = EngineConfig {
            smoothing_factor: 0.3,
            scroll_multiplier: 1.0,
            invert_scroll: false,
            ..EngineConfig::default()
        };
        let mut velocity = VelocityState::default();

        let out = transform(&ScrollSample::wheel(1.0, 0.0), &cfg, &mut velocity);

        assert_eq!(velocity.y, 0.3);
        assert_eq!(velocity.x, 0.0);
        assert_eq!(
            out,
            Transform::Replace {
                delta: PixelDelta { y: 3, x: 0 },
                seed_inertia: true,
            }
        );
    }

    #[test]
    fn test_ema_matches_recurrence() {
        let cfg = config(0.45);
        let deltas = [1.0, 3.0, -2.0, 0.0, 0.0, 5.5, -0.25, 1.0];
        let mut velocity = VelocityState::default();
        let mut expected = 0.0f64;

        for (i, d) in deltas.iter().enumerate() {
            transform(&ScrollSample::wheel(*d, -*d), &cfg, &mut velocity);
            expected = expected * (1.0 - 0.45) + d * 0.45;
            assert_eq!(velocity.y, expected, "sample {}", i);
            assert_eq!(velocity.x, -expected, "sample {}", i);
        }
    }

    #[test]
    fn test_invert_negates_output() {
        let prior = VelocityState { y: 0.8, x: -0.4 };
        let sample = ScrollSample::wheel(3.0, -1.0);
        let mut normal_velocity = prior;
        let mut inverted_velocity = VelocityState {
            y: -prior.y,
            x: -prior.x,
        };

        let normal = transform(&sample, &config(0.3), &mut normal_velocity);
        let inverted = transform(
            &sample,
            &EngineConfig {
                invert_scroll: true,
                ..config(0.3)
            },
            &mut inverted_velocity,
        );

        let (Transform::Replace { delta: a, .. }, Transform::Replace { delta: b, .. }) =
            (normal, inverted)
        else {
            panic!("expected replacements");
        };
        assert_eq!(a.y, -b.y);
        assert_eq!(a.x, -b.x);
        assert_eq!(normal_velocity.y, -inverted_velocity.y);
    }

    #[test]
    fn test_invert_from_rest() {
        let mut velocity = VelocityState::default();
        let cfg = EngineConfig {
            invert_scroll: true,
            ..config(0.5)
        };
        transform(&ScrollSample::wheel(2.0, 1.0), &cfg, &mut velocity);
        assert_eq!(velocity, VelocityState { y: -1.0, x: -0.5 });
    }

    #[test]
    fn test_continuous_passes_through() {
        let prior = VelocityState { y: 1.5, x: 0.2 };
        let mut velocity = prior;

        let out = transform(
            &ScrollSample::continuous(4.0, 1.0),
            &config(0.3),
            &mut velocity,
        );

        assert_eq!(out, Transform::PassThrough);
        assert_eq!(velocity, prior);
    }

    #[test]
    fn test_continuous_processed_when_all_events_enabled() {
        let cfg = EngineConfig {
            process_all_scroll_events: true,
            ..config(0.5)
        };
        let mut velocity = VelocityState::default();

        let out = transform(&ScrollSample::continuous(2.0, 0.0), &cfg, &mut velocity);

        assert!(matches!(out, Transform::Replace { .. }));
        assert_eq!(velocity.y, 1.0);
    }

    #[test]
    fn test_zero_delta_decays_velocity() {
        let mut velocity = VelocityState { y: 1.0, x: -1.0 };
        let out = transform(&ScrollSample::wheel(0.0, 0.0), &config(0.3), &mut velocity);

        assert_eq!(velocity.y, 0.7);
        assert_eq!(velocity.x, -0.7);
        assert_eq!(
            out,
            Transform::Replace {
                delta: PixelDelta { y: 7, x: -7 },
                seed_inertia: false,
            }
        );
    }

    #[test]
    fn test_truncation_can_yield_zero() {
        let cfg = EngineConfig {
            scroll_multiplier: 0.5,
            ..config(0.1)
        };
        let mut velocity = VelocityState::default();
        let out = transform(&ScrollSample::wheel(1.0, 0.0), &cfg, &mut velocity);

        // 0.1 * 0.5 * 10 = 0.5 -> 0
        assert_eq!(
            out,
            Transform::Replace {
                delta: PixelDelta { y: 0, x: 0 },
                seed_inertia: true,
            }
        );
    }

    #[test]
    fn test_seed_threshold() {
        let mut velocity = VelocityState::default();
        let cfg = config(0.3);

        let at = transform(&ScrollSample::wheel(0.5, -0.5), &cfg, &mut velocity);
        assert!(!seeds(at));

        let above = transform(&ScrollSample::wheel(0.0, -0.51), &cfg, &mut velocity);
        assert!(seeds(above));

        let disabled = EngineConfig {
            enable_inertia: false,
            ..cfg
        };
        let off = transform(&ScrollSample::wheel(5.0, 0.0), &disabled, &mut velocity);
        assert!(!seeds(off));
    }

    #[test]
    fn test_multiplier_scales_output() {
        let cfg = EngineConfig {
            scroll_multiplier: 2.5,
            ..config(1.0)
        };
        let mut velocity = VelocityState::default();
        let out = transform(&ScrollSample::wheel(-3.0, 1.0), &cfg, &mut velocity);
        assert_eq!(
            out,
            Transform::Replace {
                delta: PixelDelta { y: -75, x: 25 },
                seed_inertia: true,
            }
        );
    }
}

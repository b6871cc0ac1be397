//! smoothwheel-core: scroll filter, inertia simulator and tap lifecycle.
//!
//! Design goal: keep this crate platform-agnostic.
//! OS hooks, event synthesis and the accessibility check live in
//! `smoothwheel-platform` behind the traits in [`tap`].

mod config;
mod engine;
mod error;
pub mod inertia;
pub mod tap;
mod transform;

pub use config::{EngineConfig, MULTIPLIER_RANGE, SMOOTHING_RANGE};
pub use engine::{ScrollEngine, TapState};
pub use error::{EngineError, EngineResult};
pub use inertia::{InertiaStep, INERTIA_DECAY, INERTIA_STOP_THRESHOLD, INERTIA_TICK};
pub use tap::{Disposition, PermissionGate, TapBackend, TapEvent, TapHandle, TapHandler};
pub use transform::{
    transform, PixelDelta, ScrollSample, Transform, VelocityState, INERTIA_SEED_THRESHOLD,
    PIXEL_SCALE,
};

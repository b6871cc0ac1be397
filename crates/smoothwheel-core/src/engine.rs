//! Event tap controller: hook lifecycle, callback dispatch and config updates.
//!
//! Velocity, config and the inertia episode counter share one lock (the filter
//! lock). The hook callback and the inertia worker each hold it only for the
//! arithmetic plus one event synthesis or post, so a tick can never interleave
//! with a sample and nothing is posted once `stop()` has bumped the episode.

use crate::config::{clamp_field, MULTIPLIER_RANGE, SMOOTHING_RANGE};
use crate::inertia::{self, InertiaSink, InertiaStep, InertiaTrigger, InertiaWorker};
use crate::tap::{Disposition, PermissionGate, TapBackend, TapEvent, TapHandle, TapHandler};
use crate::transform::{transform, Transform};
use crate::{EngineConfig, EngineError, EngineResult, ScrollSample, VelocityState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, trace, warn};

/// Lifecycle of the interception hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapState {
    /// No hook installed.
    #[default]
    Stopped,
    /// Permission check and installation in progress.
    Starting,
    /// Hook installed and filtering.
    Running,
}

/// Filter state guarded by a single lock.
struct FilterState {
    config: EngineConfig,
    velocity: VelocityState,
    /// Current inertia episode. Bumping it cancels any running episode.
    episode: u64,
    /// Present while the engine is running.
    inertia: Option<InertiaTrigger>,
}

impl FilterState {
    fn begin_episode(&mut self) {
        self.episode += 1;
        if let Some(trigger) = &self.inertia {
            trigger.start(self.episode);
        }
    }

    fn cancel_episode(&mut self) {
        self.episode += 1;
        self.velocity.reset();
    }
}

/// The installed hook, plus a re-arm request that arrived before it was stored.
#[derive(Default)]
struct TapSlot {
    handle: Option<Arc<dyn TapHandle>>,
    rearm_pending: bool,
}

/// State reachable from the hook callback and the inertia worker.
struct Shared<B: TapBackend> {
    backend: B,
    filter: Mutex<FilterState>,
    tap: Mutex<TapSlot>,
    last_error: Mutex<Option<EngineError>>,
}

impl<B: TapBackend> Shared<B> {
    fn record(&self, err: EngineError) {
        *lock(&self.last_error) = Some(err);
    }

    fn rearm(&self, cause: TapEvent) {
        let handle = {
            let mut slot = lock(&self.tap);
            if slot.handle.is_none() {
                // Install has not returned yet; it re-arms once the handle is stored.
                slot.rearm_pending = true;
            }
            slot.handle.clone()
        };
        let Some(handle) = handle else {
            warn!(?cause, "event tap disabled during installation, re-arm deferred");
            return;
        };
        self.rearm_handle(&handle, cause);
    }

    fn rearm_handle(&self, handle: &Arc<dyn TapHandle>, cause: TapEvent) {
        match handle.rearm() {
            Ok(()) => warn!(?cause, "event tap was disabled by the OS, re-enabled"),
            Err(e) => {
                error!(error = %e, "failed to re-enable event tap");
                self.record(e);
            }
        }
    }

    fn filter_scroll(&self, sample: &ScrollSample) -> Disposition<B::Event> {
        let mut filter = lock(&self.filter);
        let config = filter.config;

        match transform(sample, &config, &mut filter.velocity) {
            Transform::PassThrough => {
                trace!(?sample, "continuous scroll passed through");
                Disposition::PassThrough
            }
            Transform::Replace {
                delta,
                seed_inertia,
            } => {
                let Some(event) = self.backend.synthesize(delta) else {
                    warn!(?delta, "scroll event synthesis failed, passing original through");
                    self.record(EngineError::SynthesisFailed);
                    return Disposition::PassThrough;
                };
                trace!(?sample, ?delta, seed_inertia, "scroll replaced");
                if seed_inertia {
                    filter.begin_episode();
                }
                Disposition::Replace(event)
            }
        }
    }
}

impl<B: TapBackend> TapHandler<B::Event> for Shared<B> {
    fn handle(&self, event: TapEvent) -> Disposition<B::Event> {
        match event {
            TapEvent::DisabledByTimeout | TapEvent::DisabledByUserInput => {
                self.rearm(event);
                Disposition::PassThrough
            }
            TapEvent::Scroll(sample) => self.filter_scroll(&sample),
        }
    }
}

impl<B: TapBackend> InertiaSink for Shared<B> {
    fn tick(&self, episode: u64) -> bool {
        let mut filter = lock(&self.filter);
        if filter.episode != episode {
            return false;
        }

        let config = filter.config;
        match inertia::step(&mut filter.velocity, &config) {
            InertiaStep::Finished => {
                debug!(episode, "inertia settled");
                false
            }
            InertiaStep::Continue(delta) => {
                // Posted under the lock so a concurrent stop() cannot race past it.
                if let Err(e) = self.backend.post(delta) {
                    warn!(error = %e, "failed to post inertia event");
                }
                true
            }
        }
    }
}

struct Lifecycle {
    state: TapState,
    inertia: Option<InertiaWorker>,
}

/// The scroll engine: owns the hook, the filter and the inertia worker.
pub struct ScrollEngine<B: TapBackend> {
    shared: Arc<Shared<B>>,
    gate: Arc<dyn PermissionGate>,
    lifecycle: Mutex<Lifecycle>,
}

impl<B: TapBackend> ScrollEngine<B> {
    /// Create a stopped engine. Call [`start`](Self::start) to install the hook.
    pub fn new(backend: B, gate: Arc<dyn PermissionGate>, config: EngineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                filter: Mutex::new(FilterState {
                    config: config.clamped(),
                    velocity: VelocityState::default(),
                    episode: 0,
                    inertia: None,
                }),
                tap: Mutex::new(TapSlot::default()),
                last_error: Mutex::new(None),
            }),
            gate,
            lifecycle: Mutex::new(Lifecycle {
                state: TapState::Stopped,
                inertia: None,
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    /// Install the hook. A no-op while running.
    ///
    /// Missing permission and installation failures are logged and recorded in
    /// [`last_error`](Self::last_error); the engine simply stays stopped.
    pub fn start(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.state != TapState::Stopped {
            debug!("event tap already installed, start ignored");
            return;
        }

        transition(&mut lifecycle, TapState::Starting);
        *lock(&self.shared.last_error) = None;
        match self.try_start(&mut lifecycle) {
            Ok(()) => {
                transition(&mut lifecycle, TapState::Running);
                info!("Scroll engine running");
            }
            Err(e) => {
                match &e {
                    EngineError::PermissionDenied => warn!(
                        "no accessibility permission, event tap not installed; grant it in \
                         System Settings > Privacy & Security > Accessibility"
                    ),
                    other => error!(
                        error = %other,
                        "event tap not installed, a restart may be needed after permission changes"
                    ),
                }
                self.shared.record(e);
                transition(&mut lifecycle, TapState::Stopped);
            }
        }
    }

    fn try_start(&self, lifecycle: &mut Lifecycle) -> EngineResult<()> {
        let trusted = self.gate.is_trusted();
        debug!(trusted, "accessibility trust status");
        if !trusted {
            return Err(EngineError::PermissionDenied);
        }

        let (worker, trigger) = InertiaWorker::spawn(self.shared.clone());
        {
            let mut filter = lock(&self.shared.filter);
            filter.velocity.reset();
            filter.inertia = Some(trigger);
        }
        lock(&self.shared.tap).rearm_pending = false;

        let handler: Arc<dyn TapHandler<B::Event>> = self.shared.clone();
        match self.shared.backend.install(handler) {
            Ok(handle) => {
                let rearm_pending = {
                    let mut slot = lock(&self.shared.tap);
                    slot.handle = Some(handle.clone());
                    std::mem::take(&mut slot.rearm_pending)
                };
                if rearm_pending {
                    self.shared
                        .rearm_handle(&handle, TapEvent::DisabledByTimeout);
                }
                lifecycle.inertia = Some(worker);
                Ok(())
            }
            Err(e) => {
                lock(&self.shared.filter).inertia = None;
                lock(&self.shared.tap).rearm_pending = false;
                worker.join();
                Err(e)
            }
        }
    }

    /// Cancel inertia and release the hook. Idempotent.
    ///
    /// When this returns, no tick is running, the handler will not be called again
    /// and velocity is zero.
    pub fn stop(&self) {
        let mut lifecycle = lock(&self.lifecycle);

        let (trigger, handle) = {
            let mut filter = lock(&self.shared.filter);
            filter.cancel_episode();
            let mut slot = lock(&self.shared.tap);
            slot.rearm_pending = false;
            (filter.inertia.take(), slot.handle.take())
        };

        drop(trigger);
        if let Some(worker) = lifecycle.inertia.take() {
            worker.join();
        }
        if let Some(handle) = handle {
            handle.uninstall();
        }
        // A callback still in flight during uninstall may have moved velocity again.
        lock(&self.shared.filter).cancel_episode();

        if lifecycle.state != TapState::Stopped {
            transition(&mut lifecycle, TapState::Stopped);
            info!("Scroll engine stopped");
        }
    }

    /// Run one intercepted event through the engine, as the hook callback does.
    pub fn on_event(&self, event: TapEvent) -> Disposition<B::Event> {
        self.shared.handle(event)
    }

    pub fn is_running(&self) -> bool {
        self.state() == TapState::Running
    }

    pub fn state(&self) -> TapState {
        lock(&self.lifecycle).state
    }

    /// Most recent lifecycle failure, cleared by a successful start.
    pub fn last_error(&self) -> Option<EngineError> {
        lock(&self.shared.last_error).clone()
    }

    pub fn current_config(&self) -> EngineConfig {
        lock(&self.shared.filter).config
    }

    pub fn velocity(&self) -> VelocityState {
        lock(&self.shared.filter).velocity
    }

    /// Flip the enabled flag, starting or stopping the hook to match.
    pub fn set_enabled(&self, enabled: bool) {
        self.update(|c| c.is_enabled = enabled);
        info!(enabled, "scroll engine enabled changed");
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }

    pub fn set_smoothing_factor(&self, value: f64) {
        let value = clamp_field("smoothing_factor", value, SMOOTHING_RANGE);
        self.update(|c| c.smoothing_factor = value);
        debug!(value, "smoothing factor changed");
    }

    pub fn set_scroll_multiplier(&self, value: f64) {
        let value = clamp_field("scroll_multiplier", value, MULTIPLIER_RANGE);
        self.update(|c| c.scroll_multiplier = value);
        debug!(value, "scroll multiplier changed");
    }

    pub fn set_enable_inertia(&self, enabled: bool) {
        self.update(|c| c.enable_inertia = enabled);
        debug!(enabled, "inertia changed");
    }

    pub fn set_invert_scroll(&self, invert: bool) {
        self.update(|c| c.invert_scroll = invert);
        debug!(invert, "invert scroll changed");
    }

    pub fn set_process_all_scroll_events(&self, all: bool) {
        self.update(|c| c.process_all_scroll_events = all);
        debug!(all, "process all scroll events changed");
    }

    /// Replace the whole config. Starts or stops the hook if `is_enabled` changed.
    pub fn apply_config(&self, config: EngineConfig) {
        let config = config.clamped();
        let previous = std::mem::replace(&mut lock(&self.shared.filter).config, config);
        if previous == config {
            return;
        }

        debug!(?config, "config applied");
        if previous.is_enabled != config.is_enabled {
            if config.is_enabled {
                self.start();
            } else {
                self.stop();
            }
        }
    }

    /// Notification from the host that accessibility trust changed.
    pub fn on_permission_changed(&self, granted: bool) {
        if granted {
            info!("accessibility permission granted");
            if self.current_config().is_enabled && !self.is_running() {
                self.start();
            }
        } else if self.is_running() {
            warn!("accessibility permission revoked, stopping event tap");
            self.stop();
            self.shared.record(EngineError::PermissionDenied);
        }
    }

    fn update(&self, apply: impl FnOnce(&mut EngineConfig)) {
        apply(&mut lock(&self.shared.filter).config);
    }
}

impl<B: TapBackend> Drop for ScrollEngine<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn transition(lifecycle: &mut Lifecycle, new_state: TapState) {
    let old = lifecycle.state;
    if old != new_state {
        lifecycle.state = new_state;
        debug!(?old, ?new_state, "state transition");
    }
}

/// Lock ignoring poison; a panicked callback must not wedge the engine.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

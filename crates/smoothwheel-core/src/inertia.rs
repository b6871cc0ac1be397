//! Inertia simulator: geometric velocity decay on a 60 Hz worker thread.
//!
//! The worker owns no filter state. Each tick calls back into an [`InertiaSink`]
//! with the episode number it was started for; the sink decides under its own lock
//! whether that episode is still current. Bumping the episode number is the
//! cancellation token: a stale tick exits without posting anything.

use crate::{EngineConfig, PixelDelta, VelocityState};
use crossbeam_channel::{bounded, never, select, tick, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Per-tick velocity decay factor.
pub const INERTIA_DECAY: f64 = 0.95;

/// Velocity magnitude below which an episode ends.
pub const INERTIA_STOP_THRESHOLD: f64 = 0.01;

/// Tick period (60 Hz).
pub const INERTIA_TICK: Duration = Duration::from_micros(16_667);

/// Result of one inertia tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InertiaStep {
    /// Post a synthetic event with this delta and keep going.
    Continue(PixelDelta),
    /// Velocity is negligible and has been zeroed.
    Finished,
}

/// Decay `velocity` by one tick.
pub fn step(velocity: &mut VelocityState, config: &EngineConfig) -> InertiaStep {
    velocity.y *= INERTIA_DECAY;
    velocity.x *= INERTIA_DECAY;

    if velocity.y.abs() < INERTIA_STOP_THRESHOLD && velocity.x.abs() < INERTIA_STOP_THRESHOLD {
        velocity.reset();
        return InertiaStep::Finished;
    }

    InertiaStep::Continue(velocity.to_pixels(config.scroll_multiplier))
}

/// Receiver of inertia ticks.
pub trait InertiaSink: Send + Sync {
    /// Run one tick of `episode`. Returns false once the episode is over
    /// (finished or superseded).
    fn tick(&self, episode: u64) -> bool;
}

impl<T: InertiaSink + ?Sized> InertiaSink for Arc<T> {
    fn tick(&self, episode: u64) -> bool {
        (**self).tick(episode)
    }
}

/// Cheap, non-blocking handle used from the hook callback.
///
/// Only the newest requested episode matters, so it lives in a single slot and
/// the channel carries nothing but a wake-up. A burst of starts collapses into
/// one pending wake that reads the latest episode.
#[derive(Debug, Clone)]
pub struct InertiaTrigger {
    latest: Arc<AtomicU64>,
    wake_tx: Sender<()>,
}

impl InertiaTrigger {
    /// Ask the worker to start ticking for `episode`. Never blocks.
    pub fn start(&self, episode: u64) {
        self.latest.store(episode, Ordering::Release);
        match self.wake_tx.try_send(()) {
            // A wake is already queued and will pick up `latest`.
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => debug!(episode, "inertia worker gone"),
        }
    }
}

/// Owner of the inertia worker thread.
///
/// The thread exits once every [`InertiaTrigger`] for it has been dropped; the
/// worker itself is joined by [`InertiaWorker::join`] or on drop.
pub struct InertiaWorker {
    thread: Option<JoinHandle<()>>,
}

impl InertiaWorker {
    /// Spawn the worker and return it with the trigger that drives it.
    pub fn spawn<S: InertiaSink + 'static>(sink: S) -> (Self, InertiaTrigger) {
        Self::spawn_with_period(sink, INERTIA_TICK)
    }

    pub(crate) fn spawn_with_period<S: InertiaSink + 'static>(
        sink: S,
        period: Duration,
    ) -> (Self, InertiaTrigger) {
        let latest = Arc::new(AtomicU64::new(0));
        let (wake_tx, wake_rx) = bounded(1);
        let worker_latest = latest.clone();
        let thread = thread::Builder::new()
            .name("smoothwheel-inertia".into())
            .spawn(move || run_loop(sink, worker_latest, wake_rx, period))
            .ok();
        if thread.is_none() {
            warn!("failed to spawn inertia worker, inertia disabled for this session");
        }

        (Self { thread }, InertiaTrigger { latest, wake_tx })
    }

    /// Wait for the worker to exit. Drop every trigger first.
    pub fn join(mut self) {
        self.join_inner();
    }

    fn join_inner(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
    }
}

impl Drop for InertiaWorker {
    fn drop(&mut self) {
        self.join_inner();
    }
}

fn run_loop<S: InertiaSink>(
    sink: S,
    latest: Arc<AtomicU64>,
    wake_rx: Receiver<()>,
    period: Duration,
) {
    info!("Inertia worker started");

    let mut episode: Option<u64> = None;
    let mut ticker: Receiver<Instant> = never();

    loop {
        select! {
            recv(wake_rx) -> wake => match wake {
                Ok(()) => {
                    let next = latest.load(Ordering::Acquire);
                    trace!(episode = next, "inertia episode starting");
                    episode = Some(next);
                    // Fresh ticker, so the first tick lands a full period after the burst.
                    ticker = tick(period);
                }
                Err(_) => break,
            },
            recv(ticker) -> _ => {
                if let Some(current) = episode {
                    if !sink.tick(current) {
                        trace!(episode = current, "inertia episode over");
                        episode = None;
                        ticker = never();
                    }
                }
            }
        }
    }

    info!("Inertia worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_step_decays_and_scales() {
        let mut velocity = VelocityState { y: 2.0, x: -1.0 };
        let config = EngineConfig::default();

        let out = step(&mut velocity, &config);

        assert_eq!(velocity, VelocityState { y: 1.9, x: -0.95 });
        assert_eq!(out, InertiaStep::Continue(PixelDelta { y: 19, x: -9 }));
    }

    #[test]
    fn test_step_monotonic_and_terminates() {
        let config = EngineConfig::default();
        for start in [0.02, 1.0, -7.5, 120.0, 1.0e6] {
            let mut velocity = VelocityState {
                y: start,
                x: start / 3.0,
            };
            let mut previous = velocity;
            let mut ticks = 0u32;

            loop {
                ticks += 1;
                let out = step(&mut velocity, &config);
                assert!(velocity.y.abs() <= previous.y.abs());
                assert!(velocity.x.abs() <= previous.x.abs());
                previous = velocity;
                if out == InertiaStep::Finished {
                    break;
                }
                assert!(ticks < 1_000, "no termination from {}", start);
            }

            assert!(velocity.is_zero());
        }
    }

    #[test]
    fn test_step_finishes_below_threshold() {
        let mut velocity = VelocityState { y: 0.0105, x: 0.0 };
        assert_eq!(step(&mut velocity, &EngineConfig::default()), InertiaStep::Finished);
        assert!(velocity.is_zero());
    }

    #[test]
    fn test_step_one_axis_keeps_episode_alive() {
        let mut velocity = VelocityState { y: 0.001, x: 0.5 };
        let out = step(&mut velocity, &EngineConfig::default());
        assert!(matches!(out, InertiaStep::Continue(_)));
        assert!(!velocity.is_zero());
    }

    /// Sink that runs a fixed number of ticks for whichever episode is current.
    struct CountingSink {
        current: Arc<AtomicU64>,
        ticks: Arc<AtomicUsize>,
        limit: usize,
    }

    impl InertiaSink for CountingSink {
        fn tick(&self, episode: u64) -> bool {
            if episode != self.current.load(Ordering::SeqCst) {
                return false;
            }
            self.ticks.fetch_add(1, Ordering::SeqCst) + 1 < self.limit
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_worker_runs_episode_to_completion() {
        let current = Arc::new(AtomicU64::new(1));
        let ticks = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink {
            current: current.clone(),
            ticks: ticks.clone(),
            limit: 5,
        };
        let (worker, trigger) = InertiaWorker::spawn_with_period(sink, Duration::from_millis(1));

        trigger.start(1);
        assert!(wait_for(|| ticks.load(Ordering::SeqCst) == 5));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ticks.load(Ordering::SeqCst), 5);

        drop(trigger);
        worker.join();
    }

    #[test]
    fn test_worker_stale_episode_stops_ticking() {
        let current = Arc::new(AtomicU64::new(1));
        let ticks = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink {
            current: current.clone(),
            ticks: ticks.clone(),
            limit: usize::MAX,
        };
        let (worker, trigger) = InertiaWorker::spawn_with_period(sink, Duration::from_millis(1));

        trigger.start(1);
        assert!(wait_for(|| ticks.load(Ordering::SeqCst) > 2));
        current.store(2, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        let settled = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ticks.load(Ordering::SeqCst), settled);

        drop(trigger);
        worker.join();
    }

    #[test]
    fn test_worker_burst_of_starts_keeps_newest_episode() {
        let current = Arc::new(AtomicU64::new(40));
        let ticks = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink {
            current: current.clone(),
            ticks: ticks.clone(),
            limit: 3,
        };
        let (worker, trigger) = InertiaWorker::spawn_with_period(sink, Duration::from_millis(1));

        for episode in 1..=40 {
            trigger.start(episode);
        }

        assert!(wait_for(|| ticks.load(Ordering::SeqCst) == 3));

        drop(trigger);
        worker.join();
    }

    #[test]
    fn test_worker_exits_when_trigger_dropped() {
        let sink = CountingSink {
            current: Arc::new(AtomicU64::new(0)),
            ticks: Arc::new(AtomicUsize::new(0)),
            limit: 1,
        };
        let (worker, trigger) = InertiaWorker::spawn(sink);
        drop(trigger);
        // Returns only if the thread saw the disconnect.
        worker.join();
    }
}

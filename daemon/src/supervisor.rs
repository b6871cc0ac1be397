//! Host loop: watches accessibility trust and the settings file.

use crate::settings;
use crossbeam_channel::{select, tick, Receiver};
use smoothwheel_core::{EngineConfig, PermissionGate, ScrollEngine, TapBackend};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Polling intervals for the supervisor loop.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    pub permission_poll: Duration,
    pub settings_poll: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            permission_poll: Duration::from_secs(2),
            settings_poll: Duration::from_secs(1),
        }
    }
}

/// Edge detector for accessibility trust.
#[derive(Debug)]
pub struct PermissionWatch {
    trusted: bool,
}

impl PermissionWatch {
    pub fn new(trusted: bool) -> Self {
        Self { trusted }
    }

    /// Record the latest trust state. Returns it only when it changed.
    pub fn observe(&mut self, trusted: bool) -> Option<bool> {
        if trusted == self.trusted {
            return None;
        }
        self.trusted = trusted;
        Some(trusted)
    }
}

/// Reloads the settings file when its modification time changes.
#[derive(Debug)]
pub struct SettingsWatch {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl SettingsWatch {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            modified: settings::modified_time(path),
        }
    }

    /// Returns freshly loaded settings if the file changed since the last poll.
    /// A deleted file is ignored; the running config stays as is.
    pub fn poll(&mut self) -> Option<EngineConfig> {
        let modified = settings::modified_time(&self.path);
        if modified == self.modified {
            return None;
        }
        self.modified = modified;
        modified.map(|_| settings::load_settings(&self.path))
    }
}

/// Block until `shutdown` fires or disconnects, forwarding trust transitions
/// and settings changes to `engine`.
pub fn supervise<B: TapBackend>(
    engine: &ScrollEngine<B>,
    gate: &dyn PermissionGate,
    settings_path: &Path,
    shutdown: &Receiver<()>,
    options: SupervisorOptions,
) {
    // Starts untrusted so a trusted first poll retries a start that failed at launch.
    let mut permission = PermissionWatch::new(false);
    let mut watched = SettingsWatch::new(settings_path);
    let permission_tick = tick(options.permission_poll);
    let settings_tick = tick(options.settings_poll);

    info!("Supervisor running");
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(permission_tick) -> _ => {
                if let Some(granted) = permission.observe(gate.is_trusted()) {
                    info!(granted, "accessibility permission changed");
                    engine.on_permission_changed(granted);
                }
            }
            recv(settings_tick) -> _ => {
                if let Some(config) = watched.poll() {
                    debug!(?config, "settings file changed");
                    engine.apply_config(config);
                }
            }
        }
    }
    info!("Supervisor exiting");
}

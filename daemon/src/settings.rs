//! Persisted engine settings in `settings.yaml`.

use anyhow::{bail, Context};
use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::Serialize;
use smoothwheel_core::EngineConfig;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Platform config directory for smoothwheel.
///
/// - macOS: ~/Library/Application Support/smoothwheel
/// - Linux: ~/.config/smoothwheel
/// - Windows: %APPDATA%\smoothwheel
pub fn config_dir() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("smoothwheel")
}

pub fn log_dir() -> PathBuf {
    config_dir().join("logs")
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("settings.yaml")
}

pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)?;
    let value: T = serde_yaml::from_str(&content)?;
    Ok(value)
}

/// Write `value` as YAML, creating the parent directory if needed.
pub fn save_yaml<T: Serialize>(path: impl AsRef<Path>, value: &T) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let content = serde_yaml::to_string(value)?;
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Load settings, falling back to defaults if the file is missing or invalid.
pub fn load_settings(path: &Path) -> EngineConfig {
    if !path.exists() {
        tracing::debug!("No settings file at {:?}, using defaults", path);
        return EngineConfig::default();
    }

    match load_yaml::<EngineConfig>(path) {
        Ok(config) => {
            tracing::info!("Loaded settings from {:?}", path);
            config.clamped()
        }
        Err(e) => {
            tracing::warn!("Failed to parse {:?}: {}, using defaults", path, e);
            EngineConfig::default()
        }
    }
}

pub fn save_settings(path: &Path, config: &EngineConfig) -> anyhow::Result<()> {
    save_yaml(path, config)?;
    tracing::info!("Saved settings to {:?}", path);
    Ok(())
}

pub fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// A single settable field, as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SettingKey {
    Enabled,
    Smoothing,
    Multiplier,
    Inertia,
    Invert,
    ProcessAll,
}

/// Parse `value` for `key` into `config`, clamping ranged fields.
pub fn apply_setting(
    config: &mut EngineConfig,
    key: SettingKey,
    value: &str,
) -> anyhow::Result<()> {
    match key {
        SettingKey::Enabled => config.is_enabled = parse_bool(value)?,
        SettingKey::Smoothing => config.smoothing_factor = parse_number(value)?,
        SettingKey::Multiplier => config.scroll_multiplier = parse_number(value)?,
        SettingKey::Inertia => config.enable_inertia = parse_bool(value)?,
        SettingKey::Invert => config.invert_scroll = parse_bool(value)?,
        SettingKey::ProcessAll => config.process_all_scroll_events = parse_bool(value)?,
    }
    *config = config.clamped();
    Ok(())
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => bail!("expected a boolean (true/false, on/off), got {:?}", other),
    }
}

fn parse_number(value: &str) -> anyhow::Result<f64> {
    let number: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("expected a number, got {:?}", value))?;
    if !number.is_finite() {
        bail!("expected a finite number, got {:?}", value);
    }
    Ok(number)
}

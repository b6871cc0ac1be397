use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossbeam_channel::bounded;
use tracing::{info, warn};

use smoothwheel_core::{PermissionGate, ScrollEngine};
use smoothwheel_platform::{NativeBackend, NativePermissionGate};

mod logging;
mod settings;
mod supervisor;

use settings::SettingKey;
use supervisor::SupervisorOptions;

#[derive(Parser)]
#[command(name = "smoothwheel")]
#[command(
    author,
    version,
    about = "Smooth, inertial scrolling for discrete mouse wheels"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (defaults to settings.yaml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write a daily rolling log file
    #[arg(long, global = true)]
    log_file: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scroll engine until interrupted (default)
    Run {
        /// Open the accessibility settings pane if permission is missing
        #[arg(long)]
        open_settings: bool,
    },
    /// Report whether this process may intercept input
    CheckPermission {
        /// Ask the OS to show its permission prompt
        #[arg(long)]
        prompt: bool,
    },
    /// Print the effective settings
    ShowConfig,
    /// Change one setting and save it
    Set {
        #[arg(value_enum)]
        key: SettingKey,
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup(cli.verbose, cli.log_file);

    let settings_path = cli.config.unwrap_or_else(settings::default_settings_path);

    match cli.command.unwrap_or(Commands::Run {
        open_settings: false,
    }) {
        Commands::Run { open_settings } => run(&settings_path, open_settings),
        Commands::CheckPermission { prompt } => {
            check_permission(prompt);
            Ok(())
        }
        Commands::ShowConfig => show_config(&settings_path),
        Commands::Set { key, value } => set(&settings_path, key, &value),
    }
}

fn run(settings_path: &Path, open_settings: bool) -> Result<()> {
    let config = settings::load_settings(settings_path);
    let gate = Arc::new(NativePermissionGate::new());

    if !gate.is_trusted() {
        warn!(
            "Accessibility permission required: enable smoothwheel in System Settings > \
             Privacy & Security > Accessibility, then restart it"
        );
        gate.request_prompt();
        if open_settings {
            gate.open_system_settings();
        }
    }

    let engine = ScrollEngine::new(NativeBackend::new(), gate.clone(), config);
    if config.is_enabled {
        engine.start();
    } else {
        info!("Scroll engine disabled in settings, waiting for changes");
    }

    let (shutdown_tx, shutdown_rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })?;

    supervisor::supervise(
        &engine,
        gate.as_ref(),
        settings_path,
        &shutdown_rx,
        SupervisorOptions::default(),
    );

    engine.stop();
    info!("Shutdown complete");
    Ok(())
}

fn check_permission(prompt: bool) {
    let gate = NativePermissionGate::new();
    if prompt {
        gate.request_prompt();
    }
    if gate.is_trusted() {
        println!("Accessibility permission: granted");
    } else {
        println!("Accessibility permission: not granted");
        println!("Grant it in System Settings > Privacy & Security > Accessibility");
        println!("  {}", smoothwheel_platform::SYSTEM_SETTINGS_URL);
    }
}

fn show_config(settings_path: &Path) -> Result<()> {
    let config = settings::load_settings(settings_path);
    println!("# {}", settings_path.display());
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

fn set(settings_path: &Path, key: SettingKey, value: &str) -> Result<()> {
    let mut config = settings::load_settings(settings_path);
    settings::apply_setting(&mut config, key, value)?;
    settings::save_settings(settings_path, &config)?;
    println!("{}", serde_yaml::to_string(&config)?.trim_end());
    Ok(())
}

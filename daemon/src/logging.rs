//! Logging setup: console always, daily rolling file on request.

use crate::settings;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize logging. `RUST_LOG` overrides the level picked by `verbose`.
///
/// With `to_file`, logs also go to `<config dir>/smoothwheel/logs/smoothwheel.log.<date>`.
pub fn setup(verbose: bool, to_file: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer().with_target(true).with_filter(filter);

    let file_layer = if to_file {
        let log_dir = settings::log_dir();
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!(
                "Warning: Failed to create log directory {:?}: {}",
                log_dir, e
            );
            None
        } else {
            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, &log_dir, "smoothwheel.log");
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(file_appender)
                    .with_filter(EnvFilter::new(level)),
            )
        }
    } else {
        None
    };

    match file_layer {
        Some(file_layer) => {
            tracing_subscriber::registry()
                .with(console_layer)
                .with(file_layer)
                .init();
            tracing::info!("File logging enabled: {:?}", settings::log_dir());
        }
        None => {
            tracing_subscriber::registry().with(console_layer).init();
        }
    }

    tracing::debug!(verbose, to_file, "Logging initialized");
}

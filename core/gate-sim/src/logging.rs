//! Logging setup for gate-sim.
//!
//! Logs go to stderr so stdout stays machine-readable. Setting
//! `GATE_LOG_DIR` adds a daily-rolling file under that directory.

use std::env;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEBUG_ENV: &str = "GATE_DEBUG_LOG";
const LOG_DIR_ENV: &str = "GATE_LOG_DIR";
const LOG_FILE_PREFIX: &str = "gate-sim.log";

/// Keeps the file writer flushing until dropped at the end of `main`.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

pub fn init() -> LoggingGuard {
    let filter = build_filter(env::var(DEBUG_ENV).ok().as_deref());

    let (file_layer, guard) = match log_dir() {
        Some(dir) => match fs_err::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer().with_writer(writer).with_ansi(false);
                (Some(layer), Some(guard))
            }
            Err(err) => {
                eprintln!("gate-sim: file logging disabled: {err}");
                (None, None)
            }
        },
        None => (None, None),
    };

    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    LoggingGuard { _file: guard }
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}

fn build_filter(debug_value: Option<&str>) -> EnvFilter {
    if debug_enabled(debug_value) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn log_dir() -> Option<PathBuf> {
    env::var_os(LOG_DIR_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

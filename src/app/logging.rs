//! Usage: Process-wide tracing setup (stdout + optional daily log file) and the panic hook.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

pub(crate) const LOG_DIR_ENV: &str = "LOG_DIR";
const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "oauth-token-bridge";

/// Keeps the non-blocking writers flushing; drop only at process exit.
pub(crate) struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

fn filter_from(raw: Option<&str>) -> EnvFilter {
    raw.and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn build_file_appender(dir: &Path) -> Result<RollingFileAppender, String> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| format!("log file init failed for {}: {e}", dir.display()))
}

pub(crate) fn init(log_dir: Option<&Path>) -> LoggingGuard {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = filter_from(rust_log.as_deref());

    let (stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let mut guards = vec![stdout_guard];

    let file_layer = log_dir.and_then(|dir| match build_file_appender(dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            Some(fmt::layer().with_ansi(false).with_writer(writer))
        }
        Err(err) => {
            eprintln!("{err}; logging to stdout only");
            None
        }
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(stdout))
        .with(file_layer);

    if let Err(err) = tracing_log::LogTracer::init() {
        eprintln!("log bridge already installed: {err}");
    }
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("tracing subscriber already installed: {err}");
    }

    install_panic_hook();
    LoggingGuard { _guards: guards }
}

/// Panics are logged with their location only; payloads may carry token material.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        tracing::error!(
            location = %location,
            "PANIC: application panicked at {location}. \
             Check the log file for context leading up to this panic."
        );
    }));
}

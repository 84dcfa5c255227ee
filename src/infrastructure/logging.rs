//! Logging system configuration and initialization
//!
//! - Console output and an optional non-blocking log file
//! - `RUST_LOG` overrides the configured level
//! - Noisy dependency targets are clamped unless TRACE is requested
//! - An existing log file is renamed with a timestamp suffix on startup and old files
//!   beyond `max_files` are pruned

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use tracing::{Subscriber, info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

const NOISY_TARGETS: [(&str, &str); 5] = [
    ("reqwest", "info"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("tokio", "info"),
];

// Keeps the file writer alive for the lifetime of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());
}

struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Builds the filter: `RUST_LOG` when set, otherwise the configured level
pub fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for_level(level))
}

fn filter_for_level(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::new(level);
    if !level.to_lowercase().contains("trace") {
        for (target, target_level) in NOISY_TARGETS {
            if let Ok(directive) = format!("{target}={target_level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Assemble the layered subscriber without installing it.
///
/// Each output is an optional layer, so any combination of file format and console
/// shares one subscriber type. The returned guard must outlive the subscriber.
fn build_subscriber(
    config: &LoggingConfig,
) -> Result<(impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>)> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let mut guard = None;
    let mut json_file = None;
    let mut plain_file = None;
    if config.file_output {
        std::fs::create_dir_all(&config.dir).with_context(|| {
            format!("Failed to create log directory {}", config.dir.display())
        })?;
        rotate_existing_log_file(&config.dir, &config.file_name)?;
        cleanup_old_logs(&config.dir, config.max_files)?;

        let file_appender = rolling::never(&config.dir, &config.file_name);
        let (file_writer, worker_guard) = non_blocking(file_appender);
        guard = Some(worker_guard);

        if config.json_format {
            json_file = Some(
                fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(LocalTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(false),
            );
        } else {
            plain_file = Some(
                fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(LocalTimeFormatter)
                    .with_target(false)
                    .with_ansi(false),
            );
        }
    }

    let console = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
    });

    let subscriber = Registry::default()
        .with(build_env_filter(&config.level))
        .with(json_file)
        .with(plain_file)
        .with(console);
    Ok((subscriber, guard))
}

/// Initialize the global subscriber. Call once, before the pipeline starts.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let (subscriber, guard) = build_subscriber(config)?;
    if let Some(guard) = guard {
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("log guard registry poisoned"))?
            .push(guard);
    }
    subscriber
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!("Logging initialized (level: {})", config.level);
    if config.file_output {
        info!("Log file: {}", config.dir.join(&config.file_name).display());
    }
    Ok(())
}

/// Rename `<dir>/<name>` to `<stem>.<timestamp>.log` if it exists
fn rotate_existing_log_file(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    let current = dir.join(file_name);
    if !current.exists() {
        return Ok(None);
    }

    let metadata = std::fs::metadata(&current)
        .with_context(|| format!("Failed to read metadata of {}", current.display()))?;
    let stamp: DateTime<Local> = metadata
        .modified()
        .unwrap_or_else(|_| std::time::SystemTime::now())
        .into();

    let stem = file_name.trim_end_matches(".log");
    let rotated = dir.join(format!("{stem}.{}.log", stamp.format("%Y%m%dT%H%M%S")));
    std::fs::rename(&current, &rotated).with_context(|| {
        format!(
            "Failed to rotate log file {} to {}",
            current.display(),
            rotated.display()
        )
    })?;
    Ok(Some(rotated))
}

/// Keep only the `max_files` most recently modified `.log` files in `dir`
fn cleanup_old_logs(dir: &Path, max_files: usize) -> Result<usize> {
    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path.extension().is_some_and(|ext| ext == "log");
        if path.is_file() && is_log {
            if let Ok(modified) = std::fs::metadata(&path).and_then(|m| m.modified()) {
                log_files.push((path, modified));
            }
        }
    }

    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(max_files) {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove old log file {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

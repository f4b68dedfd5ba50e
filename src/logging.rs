use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "codecritic.log";

/// Keeps the non-blocking file writer alive; dropping it flushes pending
/// records.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    instance_id: String,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

pub fn init_tracing(logging_config: &LoggingConfig) -> Result<LoggingGuard> {
    if logging_config.filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    if logging_config.dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }

    let log_dir = resolve_log_dir(&logging_config.dir)?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;

    let retention_warnings = purge_old_log_files_at(
        &log_dir,
        LOG_FILE_PREFIX,
        logging_config.retention_days,
        SystemTime::now(),
    );
    let appender = match logging_config.rotation {
        LoggingRotation::Daily => rolling::daily(&log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(&log_dir, LOG_FILE_PREFIX),
    };
    let (file_writer, worker_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(build_env_filter(&logging_config.filter)?);

    let stderr_layer = logging_config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let instance_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        instance_id = %instance_id,
        dir = %log_dir.display(),
        filter = %logging_config.filter,
        rotation = ?logging_config.rotation,
        retention_days = logging_config.retention_days,
        "logging_initialized"
    );
    for warning in retention_warnings {
        tracing::warn!(target: "logging", warning = %warning, "log_retention_warning");
    }

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        instance_id,
        log_dir,
    })
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter).with_context(|| format!("failed to parse logging.filter '{filter}'"))
}

fn resolve_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }

    Ok(std::env::current_dir()
        .context("failed to read current working directory for logging.dir resolution")?
        .join(dir))
}

/// Removes rotated files named `<prefix>*` whose mtime is older than the
/// retention window. Problems are returned as warnings so startup continues.
fn purge_old_log_files_at(
    log_dir: &Path,
    prefix: &str,
    retention_days: usize,
    now: SystemTime,
) -> Vec<String> {
    let retention = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60) as u64);
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            return vec![format!(
                "failed to scan logging directory {}: {err}",
                log_dir.display()
            )];
        }
    };

    entries
        .filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => return Some(format!("failed to read logging directory entry: {err}")),
            };
            if !entry.file_name().to_string_lossy().starts_with(prefix) {
                return None;
            }
            match is_expired(&entry, cutoff) {
                Ok(false) => None,
                Ok(true) => fs::remove_file(entry.path()).err().map(|err| {
                    format!(
                        "failed to remove expired log file {}: {err}",
                        entry.path().display()
                    )
                }),
                Err(warning) => Some(warning),
            }
        })
        .collect()
}

fn is_expired(entry: &fs::DirEntry, cutoff: SystemTime) -> Result<bool, String> {
    let metadata = entry
        .metadata()
        .map_err(|err| format!("failed to stat {}: {err}", entry.path().display()))?;
    if !metadata.is_file() {
        return Ok(false);
    }
    let modified = metadata
        .modified()
        .map_err(|err| format!("failed to read mtime for {}: {err}", entry.path().display()))?;
    Ok(modified <= cutoff)
}

//! Logging initialization and configuration.
//!
//! - **Production**: JSON quote logs to daily files + compact stdout
//! - **Development**: Pretty stdout with estimate spans opened and closed
//!
//! Map provider HTTP chatter (`hyper`, `reqwest`) is held at `warn` unless
//! `RUST_LOG` says otherwise, so fallback warnings from the pricing core stay
//! readable.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting production logging when set to `production`.
pub const ENV_MODE_VAR: &str = "RIDEFARE_ENV";

/// Environment variable with the base level when `RUST_LOG` is unset.
pub const LOG_LEVEL_VAR: &str = "RIDEFARE_LOG_LEVEL";

/// Environment variable overriding the production log directory.
pub const LOG_DIR_VAR: &str = "RIDEFARE_LOG_DIR";

/// File name prefix of the daily quote logs.
const LOG_FILE_PREFIX: &str = "ridefare.log";

/// Directives appended to the base level.
const QUIET_DEPENDENCIES: &str = "hyper=warn,hyper_util=warn,reqwest=warn";

/// Keep the non-blocking writers alive for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static STDOUT_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// How log output is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// JSON files plus compact stdout.
    Production,
    /// Pretty stdout only.
    Development,
}

impl LogMode {
    /// Mode named by a `RIDEFARE_ENV` value; anything but `production` is
    /// development.
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(mode) if mode.eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Whether `RIDEFARE_ENV` selects production logging.
#[must_use]
pub fn is_production() -> bool {
    LogMode::from_env_value(std::env::var(ENV_MODE_VAR).ok().as_deref()) == LogMode::Production
}

/// Filter directives for a base level, with noisy HTTP crates quieted.
fn default_directives(level: Option<&str>) -> String {
    let level = level.map(str::trim).filter(|l| !l.is_empty()).unwrap_or("info");
    format!("{level},{QUIET_DEPENDENCIES}")
}

/// Initialize the logging system.
///
/// The filter comes from `RUST_LOG`, else `RIDEFARE_LOG_LEVEL`, else `info`.
///
/// # Production Mode
///
/// - Daily JSON files in `RIDEFARE_LOG_DIR`, else `/var/log/ridefare/`
/// - Compact stdout without ANSI colors, for the journal
/// - Stdout only if the log directory cannot be created
///
/// # Development Mode
///
/// - Pretty stdout with span open/close events
///
/// # Errors
///
/// Returns an error if the env filter cannot be parsed.
pub fn init(is_production: bool) -> anyhow::Result<()> {
    let level = std::env::var(LOG_LEVEL_VAR).ok();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(level.as_deref())))?;

    if is_production {
        let override_dir = std::env::var(LOG_DIR_VAR).ok();
        init_production(env_filter, &log_directory(override_dir.as_deref()));
    } else {
        init_development(env_filter);
    }

    Ok(())
}

fn init_production(env_filter: EnvFilter, log_dir: &Path) {
    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_stdout)
        .with_target(true)
        .with_ansi(false);

    let file_layer = prepare_log_dir(log_dir).map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(file_guard);
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking_file)
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
    });
    let file_logging = file_layer.is_some();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    let _ = STDOUT_GUARD.set(stdout_guard);

    if !file_logging {
        warn!(dir = %log_dir.display(), "log directory unavailable, logging to stdout only");
    }
}

fn init_development(env_filter: EnvFilter) {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}

/// Ensure `dir` exists and return it, or `None` if it cannot be created.
fn prepare_log_dir(dir: &Path) -> Option<&Path> {
    std::fs::create_dir_all(dir).ok().map(|()| dir)
}

/// Production log directory: the override if non-blank, else the platform
/// default.
fn log_directory(override_dir: Option<&str>) -> PathBuf {
    if let Some(dir) = override_dir.map(str::trim).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/log/ridefare")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "ridefare")
            .map_or_else(|| PathBuf::from("./logs"), |dirs| dirs.data_dir().join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_mode_from_env_value() {
        assert_eq!(LogMode::from_env_value(Some("production")), LogMode::Production);
        assert_eq!(LogMode::from_env_value(Some(" PRODUCTION ")), LogMode::Production);
        assert_eq!(LogMode::from_env_value(Some("staging")), LogMode::Development);
        assert_eq!(LogMode::from_env_value(None), LogMode::Development);
    }

    #[test]
    fn test_default_directives_quiet_http_clients() {
        assert_eq!(default_directives(None), format!("info,{QUIET_DEPENDENCIES}"));
        assert_eq!(default_directives(Some("  ")), format!("info,{QUIET_DEPENDENCIES}"));
        assert!(default_directives(Some("debug")).starts_with("debug,"));
        assert!(EnvFilter::try_new(default_directives(Some("ridefare_core=trace"))).is_ok());
    }

    #[test]
    fn test_log_directory_override() {
        assert_eq!(log_directory(Some("/srv/quotes")), PathBuf::from("/srv/quotes"));
        assert_eq!(log_directory(Some("")), log_directory(None));
    }

    #[test]
    fn test_prepare_log_dir_creates_nested_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("ridefare").join("logs");

        assert_eq!(prepare_log_dir(&nested), Some(nested.as_path()));
        assert!(nested.is_dir());
    }

    #[test]
    fn test_prepare_log_dir_rejects_file_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let under_file = file.path().join("logs");
        assert_eq!(prepare_log_dir(&under_file), None);
    }
}

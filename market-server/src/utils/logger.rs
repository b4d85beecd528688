//! Logging Infrastructure
//!
//! Structured logging setup:
//! - Console output, pretty or JSON
//! - Daily rotating application logs when a log directory is given (deleted after 14 days)
//! - Audit and security logs under the same directory, never deleted

use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, prelude::*};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "market_server=info,tower_http=info";

/// Days an application log file is kept
const APP_LOG_RETENTION_DAYS: i64 = 14;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Delete `app.YYYY-MM-DD.log` files older than the retention window
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date_part) = name
            .strip_prefix("app.")
            .and_then(|d| d.strip_suffix(".log"))
            && let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            removed += 1;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }

    Ok(removed)
}

/// Periodic cleanup task - runs every hour
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

fn file_layer(
    dir: PathBuf,
    prefix: &str,
    json_format: bool,
    keep: fn(&str) -> bool,
) -> anyhow::Result<BoxedLayer> {
    fs::create_dir_all(&dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)?;

    let filter = tracing_subscriber::filter::filter_fn(move |meta| keep(meta.target()));
    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(appender));

    Ok(if json_format {
        layer.json().with_current_span(true).with_filter(filter).boxed()
    } else {
        layer.with_filter(filter).boxed()
    })
}

/// Initialize the logging system
///
/// # Arguments
/// * `json_format` - JSON console output (production) instead of pretty output
/// * `log_dir` - Optional directory for file logging (`app/`, `audit/`, `security/`)
///
/// # Examples
/// ```no_run
/// // Development setup (console only)
/// market_server::utils::logger::init_logger(false, None)?;
///
/// // Production setup (console + files)
/// market_server::utils::logger::init_logger(true, Some("/var/log/market"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger(json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if json_format {
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    }

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        layers.push(file_layer(log_dir.join("app"), "app", json_format, |target| {
            target != "audit" && target != "security"
        })?);
        layers.push(file_layer(log_dir.join("audit"), "audit", json_format, |target| {
            target == "audit"
        })?);
        layers.push(file_layer(
            log_dir.join("security"),
            "security",
            json_format,
            |target| target == "security",
        )?);

        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

/// Audit log helper - records business operations that change state
///
/// # Examples
/// ```no_run
/// market_server::audit_log!(42_i64, "checkout", "order:123");
/// market_server::audit_log!(42_i64, "transition", "order:123", "pending -> confirmed");
/// ```
#[macro_export]
macro_rules! audit_log {
    ($user_id:expr, $action:expr, $resource:expr) => {
        tracing::info!(
            target: "audit",
            user_id = $user_id,
            action = $action,
            resource = $resource,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
    ($user_id:expr, $action:expr, $resource:expr, $details:expr) => {
        tracing::info!(
            target: "audit",
            user_id = $user_id,
            action = $action,
            resource = $resource,
            details = $details,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
}

/// Security log helper - records authentication and authorization events
///
/// # Examples
/// ```no_run
/// market_server::security_log!(WARN, "auth_failed", reason = "expired");
/// market_server::security_log!(WARN, "permission_denied", user_id = 42, resource = "order:1");
/// ```
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            $($arg)*
        );
    };
    (ERROR, $event:expr, $($arg:tt)*) => {
        tracing::error!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            $($arg)*
        );
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            $($arg)*
        );
    };
}

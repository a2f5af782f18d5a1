use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the per-user directory under `$HOME`.
const APP_DIR: &str = ".estate-analyzer";
/// Name of the data directory, both in the working directory and in [`APP_DIR`].
const DATA_DIR: &str = "data";

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name to a tracing filter directive.
fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" | "CRITICAL" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        other => other.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output always goes to stderr. With `log_file`, a second plain-text layer
/// appends to that file (parent directories are created).
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Data-path discovery ────────────────────────────────────────────────────────

/// Locate the input data directory.
///
/// Checks, in order:
/// 1. `./data`
/// 2. `~/.estate-analyzer/data`
pub fn discover_data_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    discover_data_path_in(&cwd, dirs::home_dir().as_deref())
}

fn discover_data_path_in(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let mut candidates = vec![cwd.join(DATA_DIR)];
    if let Some(home) = home {
        candidates.push(home.join(APP_DIR).join(DATA_DIR));
    }
    candidates.into_iter().find(|p| p.is_dir())
}

/// `--data-dir` when given, otherwise the discovered directory.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    discover_data_path().ok_or_else(|| {
        anyhow::anyhow!(
            "No data directory found (looked for ./{DATA_DIR} and ~/{APP_DIR}/{DATA_DIR}); pass --data-dir"
        )
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

//! File logging setup.
//!
//! Logs go to `~/.steam-idler/steam-idler.log` so the interactive console
//! stays clean. `STEAM_IDLER_LOG` controls the filter (standard env-filter
//! syntax); default level is `info`.

use std::path::PathBuf;

use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = ".steam-idler";
const LOG_FILE: &str = "steam-idler.log";
const FILTER_ENV: &str = "STEAM_IDLER_LOG";

/// Initialize file logging. Returns the guard that flushes the writer; keep
/// it alive for the life of the process. Returns `None` when no log
/// directory could be prepared, in which case logging is simply off.
pub fn init() -> Option<WorkerGuard> {
    let dir = log_dir()?;
    if fs::create_dir_all(&dir).is_err() {
        return None;
    }

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(LOG_DIR))
}

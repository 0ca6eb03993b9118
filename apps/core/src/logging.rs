use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const LOG_FILE_NAME: &str = "quickpick.log";
const ARCHIVE_PREFIX: &str = "quickpick-";
const MAX_LOG_BYTES: u64 = 1_000_000;
const MAX_ARCHIVES: usize = 5;

static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("log file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid log filter '{filter}': {message}")]
    Filter { filter: String, message: String },
    #[error("subscriber already installed: {0}")]
    Install(String),
}

pub fn logs_dir() -> PathBuf {
    crate::config::stable_app_data_dir().join("logs")
}

/// Installs the global subscriber writing to `<log_dir>/quickpick.log`.
/// `RUST_LOG` takes precedence over `filter`.
pub fn init(log_dir: &Path, filter: &str) -> Result<PathBuf, LoggingError> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(LOG_FILE_NAME);
    rotate_if_needed(&log_path, log_dir, MAX_LOG_BYTES)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter).map_err(|e| LoggingError::Filter {
            filter: filter.to_string(),
            message: e.to_string(),
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    install_panic_hook();
    Ok(log_path)
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Moves the live log aside once it reaches `max_bytes`.
pub fn rotate_if_needed(
    log_path: &Path,
    log_dir: &Path,
    max_bytes: u64,
) -> Result<bool, std::io::Error> {
    let meta = match fs::metadata(log_path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    if meta.len() < max_bytes {
        return Ok(false);
    }

    let archived = log_dir.join(format!("{ARCHIVE_PREFIX}{:013}.log", now_millis()));
    fs::rename(log_path, archived)?;
    prune_old_archives(log_dir, MAX_ARCHIVES)?;
    Ok(true)
}

/// Keeps the newest `keep` archives; names sort by their timestamp.
pub fn prune_old_archives(log_dir: &Path, keep: usize) -> Result<usize, std::io::Error> {
    let mut archives = WalkDir::new(log_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(ARCHIVE_PREFIX) && n.ends_with(".log"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    archives.sort();
    let excess = archives.len().saturating_sub(keep);
    for oldest in archives.iter().take(excess) {
        fs::remove_file(oldest)?;
    }
    Ok(excess)
}

fn install_panic_hook() {
    let _ = PANIC_HOOK_INSTALLED.get_or_init(|| {
        let prior = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let location = panic_info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "unknown".to_string());
            let payload = panic_info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic payload unavailable".to_string());
            tracing::error!(%location, %payload, "panic");
            prior(panic_info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::{logs_dir, prune_old_archives, rotate_if_needed, LOG_FILE_NAME};

    #[test]
    fn logs_dir_uses_stable_app_data_layout() {
        let dir = logs_dir();
        assert!(dir
            .to_string_lossy()
            .to_ascii_lowercase()
            .contains("quickpick"));
    }

    #[test]
    fn rotates_only_past_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join(LOG_FILE_NAME);
        assert!(!rotate_if_needed(&log_path, dir.path(), 16).unwrap());

        std::fs::write(&log_path, b"short").unwrap();
        assert!(!rotate_if_needed(&log_path, dir.path(), 16).unwrap());

        std::fs::write(&log_path, vec![b'x'; 32]).unwrap();
        assert!(rotate_if_needed(&log_path, dir.path(), 16).unwrap());
        assert!(!log_path.exists());
    }

    #[test]
    fn prunes_oldest_archives() {
        let dir = tempfile::tempdir().unwrap();
        for stamp in 1..=7 {
            let name = format!("quickpick-{stamp:013}.log");
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::write(dir.path().join(LOG_FILE_NAME), b"live").unwrap();

        assert_eq!(prune_old_archives(dir.path(), 5).unwrap(), 2);
        assert!(!dir.path().join("quickpick-0000000000001.log").exists());
        assert!(dir.path().join("quickpick-0000000000007.log").exists());
        assert!(dir.path().join(LOG_FILE_NAME).exists());
    }
}

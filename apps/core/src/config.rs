use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::commit::CommitMode;
use crate::keymap::MAX_SLOT_KEYS;
use crate::paging::DEFAULT_PAGE_SIZE;
use crate::search::{RankOptions, DEFAULT_LIMIT, DEFAULT_THRESHOLD, DEFAULT_TIE_EPSILON};

const APP_DIR_NAME: &str = "quickpick";
pub const DEFAULT_STATS_LIMIT: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub list_limit: usize,
    pub page_size: usize,
    pub match_threshold: f64,
    pub tie_epsilon: f64,
    pub stats_limit: usize,
    pub commit_mode: CommitMode,
    pub native_fallback: bool,
    pub inject_pipe_path: PathBuf,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        let base = stable_app_data_dir();
        Self {
            list_limit: DEFAULT_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
            match_threshold: DEFAULT_THRESHOLD,
            tie_epsilon: DEFAULT_TIE_EPSILON,
            stats_limit: DEFAULT_STATS_LIMIT,
            commit_mode: CommitMode::Output,
            native_fallback: true,
            inject_pipe_path: default_inject_pipe_path(),
            db_path: base.join("snippets.sqlite3"),
            config_path: base.join("config.toml"),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            limit: self.list_limit,
            threshold: self.match_threshold,
            tie_epsilon: self.tie_epsilon,
        }
    }
}

/// Per-user data directory: `%APPDATA%\quickpick` on Windows,
/// `$XDG_DATA_HOME/quickpick` or `~/.local/share/quickpick` elsewhere.
pub fn stable_app_data_dir() -> PathBuf {
    let root = if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA").map(PathBuf::from)
    } else {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share")))
    };
    root.unwrap_or_else(std::env::temp_dir).join(APP_DIR_NAME)
}

fn default_inject_pipe_path() -> PathBuf {
    if cfg!(target_os = "windows") {
        PathBuf::from(r"\\.\pipe\quickpick_inject")
    } else {
        stable_app_data_dir().join("inject.sock")
    }
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if !(1..=50).contains(&cfg.list_limit) {
        return Err(ConfigError::Invalid("list_limit must be within 1..=50".into()));
    }
    if !(1..=MAX_SLOT_KEYS).contains(&cfg.page_size) {
        return Err(ConfigError::Invalid(format!(
            "page_size must be within 1..={MAX_SLOT_KEYS}"
        )));
    }
    if !(cfg.match_threshold > 0.0 && cfg.match_threshold <= 1.0) {
        return Err(ConfigError::Invalid("match_threshold must be within (0, 1]".into()));
    }
    if !(0.0..=0.1).contains(&cfg.tie_epsilon) {
        return Err(ConfigError::Invalid("tie_epsilon must be within [0, 0.1]".into()));
    }
    if cfg.stats_limit > 10 {
        return Err(ConfigError::Invalid("stats_limit must be at most 10".into()));
    }
    if cfg.db_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("db_path is required".into()));
    }
    if cfg.config_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("config_path is required".into()));
    }
    Ok(())
}

/// Loads `path` (or the default location). A missing file yields defaults.
/// `.json` / `.json5` files are parsed as JSON5, anything else as TOML.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Config::default().config_path);
    if !path.exists() {
        return Ok(Config {
            config_path: path,
            ..Config::default()
        });
    }

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let mut cfg = parse(&path, &raw)?;
    cfg.config_path = path;
    validate(&cfg)?;
    Ok(cfg)
}

fn parse(path: &Path, raw: &str) -> Result<Config, ConfigError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("json5"));
    let parsed = if is_json {
        json5::from_str::<Config>(raw).map_err(|e| e.to_string())
    } else {
        toml::from_str::<Config>(raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    validate(cfg)?;
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let encoded = toml::to_string_pretty(cfg)?;
    std::fs::write(&cfg.config_path, encoded).map_err(|source| ConfigError::Write {
        path: cfg.config_path.clone(),
        source,
    })
}

use crate::errors::BackupError;
use crate::model::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration settings for a backup run
///
/// Loaded once at process start and passed by reference everywhere; no
/// part of the pipeline reads ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Username handed to the fetch command
    pub username: String,

    /// Password handed to the fetch command
    pub password: String,

    /// Timeout in seconds for one device fetch
    pub conn_timeout: u64,

    /// Remove volatile clock-period lines before comparing configs
    pub fix_clock_period: bool,

    /// Platforms whose configs embed a clock-period line
    pub fix_clock_period_platforms: Vec<Platform>,

    /// Collapse duplicated line feeds before comparing configs
    pub fix_double_line_feed: bool,

    /// Platforms eligible for the double-line-feed fix
    pub fix_platform_list: Vec<Platform>,

    /// Maximum number of devices polled concurrently
    pub max_concurrent_backups: usize,

    /// Directory holding the inventory file and stored configs
    pub data_dir: PathBuf,

    /// Fetch command template; supports {ip}, {platform}, {username}
    /// and {password} placeholders
    pub fetch_command: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            conn_timeout: 60,
            fix_clock_period: true,
            fix_clock_period_platforms: vec![Platform::Ios],
            fix_double_line_feed: false,
            fix_platform_list: Vec::new(),
            max_concurrent_backups: 16,
            data_dir: PathBuf::from("./data"),
            fetch_command: String::new(),
        }
    }
}

impl BackupConfig {
    /// True when the clock-period fix applies to this platform
    pub fn clock_period_fix_applies(&self, platform: &Platform) -> bool {
        self.fix_clock_period && self.fix_clock_period_platforms.contains(platform)
    }

    /// True when the double-line-feed fix applies to this platform
    pub fn line_feed_fix_applies(&self, platform: &Platform) -> bool {
        self.fix_double_line_feed && self.fix_platform_list.contains(platform)
    }
}

/// Load the run configuration from a YAML file
///
/// Resolution order: explicit path argument, then the CONFKEEP_CONFIG
/// environment variable, then `confkeep.yaml`. A missing file yields the
/// defaults; a file that exists but does not parse is a hard error.
pub async fn load_config(path: Option<&str>) -> Result<BackupConfig, BackupError> {
    let path = match path {
        Some(p) => p.to_string(),
        None => std::env::var("CONFKEEP_CONFIG").unwrap_or_else(|_| "confkeep.yaml".to_string()),
    };

    if !Path::new(&path).exists() {
        tracing::warn!("no config file at {}, using defaults", path);
        return Ok(BackupConfig::default());
    }

    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| BackupError::Config(format!("{}: {}", path, e)))?;
    if text.trim().is_empty() {
        return Ok(BackupConfig::default());
    }

    let mut config: BackupConfig =
        serde_yaml::from_str(&text).map_err(|e| BackupError::Config(format!("{}: {}", path, e)))?;
    config.max_concurrent_backups = config.max_concurrent_backups.max(1);
    Ok(config)
}

//! Agent configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/queuetimer/agent.toml`
//! - Windows: `%APPDATA%/queuetimer/agent.toml`

use std::path::PathBuf;
use std::time::Duration;

use queuetimer_game_log::{MaplessPolicy, WatcherConfig};
use queuetimer_protocol::constants::{
    DEFAULT_FOCUS_INTERVAL, DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL, GAME_PROCESS_NAME,
};
use serde::{Deserialize, Serialize};

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Explicit `console.log` path. Discovered through Steam when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds a finished session waits for its map announcement.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,

    /// Whether sessions that never saw a map are recorded.
    #[serde(default)]
    pub mapless_sessions: MaplessPolicy,

    /// Foreground window poll interval in milliseconds.
    #[serde(default = "default_focus_poll_interval_ms")]
    pub focus_poll_interval_ms: u64,

    /// Executable whose window must have focus for the overlay to show.
    #[serde(default = "default_focus_process")]
    pub focus_process: String,

    /// CSV file finished sessions are appended to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_log: Option<PathBuf>,

    /// Empty `console.log` before watching it.
    #[serde(default = "default_true")]
    pub clear_log_on_start: bool,

    /// Ignore log content written before the agent started.
    #[serde(default = "default_true")]
    pub start_at_end: bool,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_grace_period_secs() -> u64 {
    DEFAULT_GRACE_PERIOD.as_secs()
}

fn default_focus_poll_interval_ms() -> u64 {
    DEFAULT_FOCUS_INTERVAL.as_millis() as u64
}

fn default_focus_process() -> String {
    GAME_PROCESS_NAME.into()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: None,
            poll_interval_ms: default_poll_interval_ms(),
            grace_period_secs: default_grace_period_secs(),
            mapless_sessions: MaplessPolicy::default(),
            focus_poll_interval_ms: default_focus_poll_interval_ms(),
            focus_process: default_focus_process(),
            session_log: None,
            clear_log_on_start: default_true(),
            start_at_end: default_true(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Saves the current configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Watcher settings for the given log file.
    pub fn watcher_config(&self, log_path: PathBuf) -> WatcherConfig {
        WatcherConfig {
            log_path,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            grace_period: Duration::from_secs(self.grace_period_secs),
            mapless: self.mapless_sessions,
            start_at_end: self.start_at_end,
        }
    }

    /// Focus poll interval.
    pub fn focus_interval(&self) -> Duration {
        Duration::from_millis(self.focus_poll_interval_ms)
    }
}

/// Directory holding the config file and the instance lock.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("queuetimer"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home).join(".config").join("queuetimer"))
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("agent.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.log_path, None);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.grace_period_secs, 30);
        assert_eq!(config.focus_poll_interval_ms, 500);
        assert_eq!(config.mapless_sessions, MaplessPolicy::Emit);
        assert_eq!(config.focus_process, "tf_win64.exe");
        assert!(config.clear_log_on_start);
        assert!(config.start_at_end);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = Config {
            log_path: Some(PathBuf::from("/games/tf/console.log")),
            poll_interval_ms: 250,
            grace_period_secs: 0,
            mapless_sessions: MaplessPolicy::Discard,
            focus_poll_interval_ms: 1000,
            focus_process: "hl2.exe".into(),
            session_log: Some(PathBuf::from("/tmp/sessions.csv")),
            clear_log_on_start: false,
            start_at_end: false,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains(r#"mapless_sessions = "discard""#));
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn config_partial_toml() {
        // Only specify the grace period, rest should use defaults.
        let config: Config = toml::from_str("grace_period_secs = 5").unwrap();
        assert_eq!(config.grace_period_secs, 5);
        assert_eq!(config.poll_interval_ms, 100);
        assert!(config.clear_log_on_start);
        assert_eq!(config.session_log, None);
    }

    #[test]
    fn default_omits_unset_paths() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(!toml_str.contains("log_path"));
        assert!(!toml_str.contains("session_log"));
    }

    #[test]
    fn watcher_config_conversion() {
        let config = Config {
            grace_period_secs: 12,
            ..Config::default()
        };
        let watcher = config.watcher_config(PathBuf::from("console.log"));
        assert_eq!(watcher.log_path, PathBuf::from("console.log"));
        assert_eq!(watcher.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(watcher.grace_period, Duration::from_secs(12));
        assert!(watcher.start_at_end);
        assert_eq!(config.focus_interval(), DEFAULT_FOCUS_INTERVAL);
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("queuetimer"));
    }
}

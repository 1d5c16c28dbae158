use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub lidarr: LidarrConfig,
    #[serde(default)]
    pub hunt: HuntConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LidarrConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// What to hunt for and how much of it per cycle.
///
/// Quotas count successful searches; a quota of zero or less is unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuntConfig {
    /// `artist`, `album`, `both` or `off`.
    #[serde(default = "default_missing_mode")]
    pub missing_mode: String,
    #[serde(default = "default_quota")]
    pub missing_items: i64,
    /// `off`, `album`, `track` or `artist`.
    #[serde(default = "default_upgrade_mode")]
    pub upgrade_mode: String,
    #[serde(default = "default_quota")]
    pub upgrade_items: i64,
    #[serde(default = "default_true")]
    pub random_selection: bool,
    #[serde(default = "default_true")]
    pub monitored_only: bool,
    /// Remember upgraded items across cycles the way missing items are.
    #[serde(default)]
    pub persist_upgrade_state: bool,
}

/// Every pause the daemon takes, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_sleep_duration")]
    pub sleep_duration_secs: u64,
    #[serde(default = "default_refresh_settle")]
    pub refresh_settle_secs: u64,
    #[serde(default = "default_soft_fail_backoff")]
    pub soft_fail_backoff_secs: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
    #[serde(default = "default_cycle_delay")]
    pub cycle_delay_secs: u64,
    #[serde(default = "default_idle_delay")]
    pub idle_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Hours before the processed sets are forgotten. Zero or less never resets.
    #[serde(default = "default_reset_interval")]
    pub reset_interval_hours: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingMode {
    Artist,
    Album,
    Both,
    Off,
}

impl MissingMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "artist" => Some(Self::Artist),
            "album" => Some(Self::Album),
            "both" => Some(Self::Both),
            "off" | "none" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn includes_artists(self) -> bool {
        matches!(self, Self::Artist | Self::Both)
    }

    pub fn includes_albums(self) -> bool {
        matches!(self, Self::Album | Self::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeMode {
    Off,
    Album,
    Track,
    Artist,
}

impl UpgradeMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "album" => Some(Self::Album),
            "track" => Some(Self::Track),
            "artist" => Some(Self::Artist),
            _ => None,
        }
    }
}

impl HuntConfig {
    /// Parsed `missing_mode`; unknown values fall back to `artist`.
    pub fn missing_mode(&self) -> MissingMode {
        MissingMode::parse(&self.missing_mode).unwrap_or_else(|| {
            warn!(
                "Unknown missing_mode={:?}; defaulting to artist missing",
                self.missing_mode
            );
            MissingMode::Artist
        })
    }

    /// Parsed `upgrade_mode`; unknown values fall back to `off`.
    pub fn upgrade_mode(&self) -> UpgradeMode {
        UpgradeMode::parse(&self.upgrade_mode).unwrap_or_else(|| {
            warn!(
                "Unknown upgrade_mode={:?}; upgrades disabled",
                self.upgrade_mode
            );
            UpgradeMode::Off
        })
    }
}

impl TimingConfig {
    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(self.sleep_duration_secs)
    }

    pub fn refresh_settle(&self) -> Duration {
        Duration::from_secs(self.refresh_settle_secs)
    }

    pub fn soft_fail_backoff(&self) -> Duration {
        Duration::from_secs(self.soft_fail_backoff_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(self.cycle_delay_secs)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_secs(self.idle_delay_secs)
    }
}

impl Default for LidarrConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for HuntConfig {
    fn default() -> Self {
        Self {
            missing_mode: default_missing_mode(),
            missing_items: default_quota(),
            upgrade_mode: default_upgrade_mode(),
            upgrade_items: default_quota(),
            random_selection: true,
            monitored_only: true,
            persist_upgrade_state: false,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sleep_duration_secs: default_sleep_duration(),
            refresh_settle_secs: default_refresh_settle(),
            soft_fail_backoff_secs: default_soft_fail_backoff(),
            error_backoff_secs: default_error_backoff(),
            cycle_delay_secs: default_cycle_delay(),
            idle_delay_secs: default_idle_delay(),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            reset_interval_hours: default_reset_interval(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8686".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_missing_mode() -> String {
    "artist".to_string()
}

fn default_upgrade_mode() -> String {
    "off".to_string()
}

fn default_quota() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_sleep_duration() -> u64 {
    900
}

fn default_refresh_settle() -> u64 {
    5
}

fn default_soft_fail_backoff() -> u64 {
    10
}

fn default_error_backoff() -> u64 {
    60
}

fn default_cycle_delay() -> u64 {
    300
}

fn default_idle_delay() -> u64 {
    60
}

fn default_state_file() -> PathBuf {
    platform::data_dir().join("state.json")
}

fn default_reset_interval() -> i64 {
    168
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read `path`, writing a default file first if there is none.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        std::env::var_os(platform::CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| platform::config_dir().join("config.toml"))
    }

    /// Layer environment variables over the file values.
    ///
    /// Malformed integers are reported and ignored; booleans are `true` only
    /// for a case-insensitive `"true"`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("API_URL") {
            self.lidarr.api_url = v;
        }
        if let Some(v) = lookup("API_KEY") {
            self.lidarr.api_key = v;
        }
        if let Some(v) = lookup("HUNT_MISSING_MODE") {
            self.hunt.missing_mode = v;
        }
        if let Some(v) = lookup("HUNT_UPGRADE_MODE") {
            self.hunt.upgrade_mode = v;
        }
        override_int(&lookup, "HUNT_MISSING_ITEMS", &mut self.hunt.missing_items);
        override_int(&lookup, "HUNT_UPGRADE_ITEMS", &mut self.hunt.upgrade_items);
        override_int(
            &lookup,
            "STATE_RESET_INTERVAL_HOURS",
            &mut self.state.reset_interval_hours,
        );

        let mut sleep = self.timing.sleep_duration_secs as i64;
        override_int(&lookup, "SLEEP_DURATION", &mut sleep);
        self.timing.sleep_duration_secs = sleep.max(0) as u64;

        override_bool(&lookup, "RANDOM_SELECTION", &mut self.hunt.random_selection);
        override_bool(&lookup, "MONITORED_ONLY", &mut self.hunt.monitored_only);
        override_bool(&lookup, "DEBUG_MODE", &mut self.log.debug);
    }
}

fn override_int<F>(lookup: &F, key: &str, slot: &mut i64)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<i64>() {
        Ok(value) => *slot = value,
        Err(_) => warn!("Invalid {}={:?}; keeping {}", key, raw, slot),
    }
}

fn override_bool<F>(lookup: &F, key: &str, slot: &mut bool)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().eq_ignore_ascii_case("true");
    }
}

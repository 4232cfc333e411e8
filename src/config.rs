use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MosaicConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationsConfig,
    pub scheduler: SchedulerConfig,
    pub profile: ProfileConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Desktop notification bridge endpoint; unset disables delivery.
    pub bridge_url: Option<String>,
    pub enabled: bool,
    pub default_sound: Option<String>,
    pub max_attempts: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub tick_seconds: u64,
}

/// Defaults for the lazily created user profile.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProfileConfig {
    pub timezone: String,
    pub week_boundary: String,
    pub default_privacy_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_mosaic_dir()
            .join("mosaic.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            bridge_url: None,
            enabled: true,
            default_sound: Some("default".into()),
            max_attempts: 3,
            timeout_secs: 5,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_seconds: 60,
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".into(),
            week_boundary: "monday".into(),
            default_privacy_level: "private".into(),
        }
    }
}

/// Returns `~/.mosaic/`
pub fn default_mosaic_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mosaic")
}

/// Returns the default config file path: `~/.mosaic/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mosaic_dir().join("config.toml")
}

impl MosaicConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MosaicConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (MOSAIC_DB, MOSAIC_BRIDGE_URL,
    /// MOSAIC_LOG_LEVEL, MOSAIC_TIMEZONE, MOSAIC_NOTIFICATIONS_ENABLED,
    /// MOSAIC_TICK_SECONDS).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MOSAIC_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("MOSAIC_BRIDGE_URL") {
            self.notifications.bridge_url = Some(val);
        }
        if let Ok(val) = std::env::var("MOSAIC_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("MOSAIC_TIMEZONE") {
            self.profile.timezone = val;
        }
        if let Ok(val) = std::env::var("MOSAIC_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = matches!(val.as_str(), "1" | "true" | "yes");
        }
        if let Ok(val) = std::env::var("MOSAIC_TICK_SECONDS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.scheduler.tick_seconds = secs.max(1);
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed. An empty path is
    /// a startup failure: the store has nowhere to live.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        if self.storage.db_path.trim().is_empty() {
            anyhow::bail!("storage.db_path (or MOSAIC_DB) must be set");
        }
        Ok(expand_tilde(&self.storage.db_path))
    }

    /// Profile defaults parsed from configuration, falling back per-field.
    pub fn profile_defaults(&self) -> crate::store::user::ProfileDefaults {
        use crate::store::user::ProfileDefaults;
        let base = ProfileDefaults::default();
        ProfileDefaults {
            name: base.name,
            timezone: self.profile.timezone.clone(),
            week_boundary: self
                .profile
                .week_boundary
                .parse()
                .unwrap_or(base.week_boundary),
            default_privacy_level: self
                .profile
                .default_privacy_level
                .parse()
                .unwrap_or(base.default_privacy_level),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MosaicConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert!(config.storage.db_path.ends_with("mosaic.db"));
        assert_eq!(config.notifications.max_attempts, 3);
        assert_eq!(config.scheduler.tick_seconds, 60);
        assert!(config.resolved_db_path().is_ok());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[notifications]
bridge_url = "http://localhost:8765/notify"
enabled = false

[scheduler]
tick_seconds = 30

[profile]
timezone = "America/New_York"
week_boundary = "sunday"
"#;
        let config: MosaicConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(
            config.notifications.bridge_url.as_deref(),
            Some("http://localhost:8765/notify")
        );
        assert!(!config.notifications.enabled);
        assert_eq!(config.scheduler.tick_seconds, 30);
        // defaults still apply for unset fields
        assert_eq!(config.notifications.max_attempts, 3);

        let defaults = config.profile_defaults();
        assert_eq!(defaults.timezone, "America/New_York");
        assert_eq!(
            defaults.week_boundary,
            crate::store::types::WeekBoundary::Sunday
        );
    }

    #[test]
    fn empty_db_path_fails_resolution() {
        let mut config = MosaicConfig::default();
        config.storage.db_path = "  ".into();
        assert!(config.resolved_db_path().is_err());
    }
}

//! # Client Configuration
//!
//! Configuration for the rider poll loop, session storage and cart limits.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FEAST_POLL_INTERVAL_MS=3000                                        │
//! │     FEAST_SESSION_KEY=feast.rider.session                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/feast-client/feast.toml (Linux)                          │
//! │     ~/Library/Application Support/com.feast.client/feast.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [rider]
//! poll_interval_ms = 5000
//! refresh_queue_after_pull = true
//!
//! [storage]
//! session_key = "feast.rider.session"
//!
//! [cart]
//! max_lines = 50
//! max_quantity = 99
//! max_note_len = 200
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use feast_core::CartLimits;

use crate::error::{SessionError, SessionResult};

// =============================================================================
// Rider Settings
// =============================================================================

/// Poll loop behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderSettings {
    /// Interval between pull attempts while seeking (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Refresh the advisory queue count after each successful pull.
    #[serde(default = "default_true")]
    pub refresh_queue_after_pull: bool,
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for RiderSettings {
    fn default() -> Self {
        RiderSettings {
            poll_interval_ms: default_poll_interval(),
            refresh_queue_after_pull: true,
        }
    }
}

impl RiderSettings {
    /// The poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the rider session snapshot is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Fixed key the snapshot is stored under.
    #[serde(default = "default_session_key")]
    pub session_key: String,

    /// Directory for the JSON file store; platform data dir when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_session_key() -> String {
    "feast.rider.session".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            session_key: default_session_key(),
            data_dir: None,
        }
    }
}

// =============================================================================
// Cart Settings
// =============================================================================

/// Cart caps, mapped onto `feast_core::CartLimits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSettings {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,

    #[serde(default = "default_max_note_len")]
    pub max_note_len: usize,
}

fn default_max_lines() -> usize {
    feast_core::MAX_CART_LINES
}

fn default_max_quantity() -> u32 {
    feast_core::MAX_LINE_QUANTITY
}

fn default_max_note_len() -> usize {
    feast_core::MAX_NOTE_LEN
}

impl Default for CartSettings {
    fn default() -> Self {
        CartSettings {
            max_lines: default_max_lines(),
            max_quantity: default_max_quantity(),
            max_note_len: default_max_note_len(),
        }
    }
}

impl CartSettings {
    /// The limits handed to a new cart.
    pub fn limits(&self) -> CartLimits {
        CartLimits {
            max_lines: self.max_lines,
            max_quantity: self.max_quantity,
            max_note_len: self.max_note_len,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete client-core configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeastConfig {
    #[serde(default)]
    pub rider: RiderSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub cart: CartSettings,
}

impl FeastConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (feast.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SessionError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SessionResult<()> {
        if self.rider.poll_interval_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }

        validate_session_key(&self.storage.session_key)?;

        if self.cart.max_lines == 0 || self.cart.max_quantity == 0 || self.cart.max_note_len == 0 {
            return Err(SessionError::InvalidConfig(
                "cart limits must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the environment in production).
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(interval) = lookup("FEAST_POLL_INTERVAL_MS") {
            match interval.parse::<u64>() {
                Ok(ms) => {
                    debug!(poll_interval_ms = ms, "Overriding poll interval from environment");
                    self.rider.poll_interval_ms = ms;
                }
                Err(_) => warn!(value = %interval, "Ignoring invalid FEAST_POLL_INTERVAL_MS"),
            }
        }

        if let Some(key) = lookup("FEAST_SESSION_KEY") {
            debug!(session_key = %key, "Overriding session key from environment");
            self.storage.session_key = key;
        }

        if let Some(dir) = lookup("FEAST_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(qty) = lookup("FEAST_CART_MAX_QUANTITY") {
            if let Ok(q) = qty.parse::<u32>() {
                self.cart.max_quantity = q;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "feast", "client")
            .map(|dirs| dirs.config_dir().join("feast.toml"))
    }

    /// Directory for the JSON session store.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage.data_dir.clone().or_else(|| {
            directories::ProjectDirs::from("com", "feast", "client")
                .map(|dirs| dirs.data_dir().to_path_buf())
        })
    }
}

/// Checks a storage key. The key names a file in the data directory, so it
/// must be a plain file stem.
pub(crate) fn validate_session_key(key: &str) -> SessionResult<()> {
    if key.trim().is_empty() {
        return Err(SessionError::InvalidConfig(
            "session_key must not be empty".into(),
        ));
    }

    if key == "." || key == ".." || key.contains(['/', '\\', ':', '\0']) {
        return Err(SessionError::InvalidConfig(format!(
            "session_key {:?} must not contain path separators",
            key
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = FeastConfig::default();
        assert_eq!(config.rider.poll_interval(), Duration::from_secs(5));
        assert!(config.rider.refresh_queue_after_pull);
        assert_eq!(config.storage.session_key, "feast.rider.session");
        assert_eq!(config.cart.limits(), CartLimits::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = FeastConfig::default();
        config.rider.poll_interval_ms = 0;
        assert!(config.validate().unwrap_err().is_config_error());

        let mut config = FeastConfig::default();
        config.storage.session_key = "  ".into();
        assert!(config.validate().is_err());

        let mut config = FeastConfig::default();
        config.cart.max_quantity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_key_must_be_a_file_stem() {
        for key in ["../x", "a/b", "a\\b", "..", "C:evil"] {
            let mut config = FeastConfig::default();
            config.storage.session_key = key.into();
            assert!(config.validate().unwrap_err().is_config_error(), "{key}");
        }

        let mut config = FeastConfig::default();
        config.apply_overrides(|key| match key {
            "FEAST_SESSION_KEY" => Some("../../outside".to_string()),
            _ => None,
        });
        assert!(config.validate().is_err());

        assert!(FeastConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: FeastConfig = toml::from_str(
            r#"
            [rider]
            poll_interval_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.rider.poll_interval_ms, 1500);
        assert!(config.rider.refresh_queue_after_pull);
        assert_eq!(config.cart.max_lines, feast_core::MAX_CART_LINES);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FEAST_POLL_INTERVAL_MS", "250"),
            ("FEAST_SESSION_KEY", "tab.session"),
            ("FEAST_CART_MAX_QUANTITY", "not-a-number"),
        ]);

        let mut config = FeastConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.rider.poll_interval_ms, 250);
        assert_eq!(config.storage.session_key, "tab.session");
        assert_eq!(config.cart.max_quantity, feast_core::MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("feast.toml");

        let mut config = FeastConfig::default();
        config.rider.poll_interval_ms = 2000;
        config.save(Some(path.clone())).unwrap();

        let loaded = FeastConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.rider.poll_interval_ms, 2000);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&FeastConfig::default()).unwrap();
        assert!(toml_str.contains("[rider]"));
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("[cart]"));
    }
}

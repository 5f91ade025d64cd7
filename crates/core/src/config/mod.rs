//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WAYPOINT_*)
//! 2. TOML config file (if WAYPOINT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{PartitionNames, RetentionPolicy, retention};
use crate::classify::{ClassificationRule, Classifier, default_rules};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WAYPOINT_*)
/// 2. TOML config file (if WAYPOINT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache store. Several agents may share one file.
    ///
    /// Set via WAYPOINT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix shared by every partition this agent has ever created.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Version tag baked into partition names. Bumping it retires all
    /// partitions of the previous version on the next activation.
    ///
    /// Set via WAYPOINT_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin of the hosting application; precache paths and the
    /// notification root resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Paths seeded into the static partition on install.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Wait in `installed` until a SKIP_WAITING control message arrives.
    #[serde(default)]
    pub hold_after_install: bool,

    /// How many times the host retries a failed install before giving up.
    #[serde(default = "default_install_attempts")]
    pub install_attempts: u32,

    #[serde(default = "default_font_timeout_ms")]
    pub font_timeout_ms: u64,

    #[serde(default = "default_static_timeout_ms")]
    pub static_timeout_ms: u64,

    #[serde(default = "default_image_timeout_ms")]
    pub image_timeout_ms: u64,

    #[serde(default = "default_max_entry_age_secs")]
    pub max_entry_age_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Images declaring at least this many bytes are not cached.
    #[serde(default = "default_image_size_ceiling")]
    pub image_size_ceiling: u64,

    #[serde(default)]
    pub max_entries_per_partition: Option<usize>,

    /// Ordered classification rules. Empty means the built-in set.
    #[serde(default)]
    pub rules: Vec<ClassificationRule>,

    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    #[serde(default = "default_notification_badge")]
    pub notification_badge: String,

    /// Vibration pattern in milliseconds (on, off, on, ...).
    #[serde(default = "default_vibrate_pattern")]
    pub vibrate_pattern: Vec<u32>,

    /// Body used when a push arrives without a payload.
    #[serde(default = "default_push_body")]
    pub default_push_body: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./waypoint-cache.sqlite")
}

fn default_namespace() -> String {
    "waypoint".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_user_agent() -> String {
    "waypoint/0.1".into()
}

fn default_precache_manifest() -> Vec<String> {
    vec!["/".into(), "/manifest.json".into(), "/icon-192x192.png".into()]
}

fn default_install_attempts() -> u32 {
    3
}

fn default_font_timeout_ms() -> u64 {
    5_000
}

fn default_static_timeout_ms() -> u64 {
    8_000
}

fn default_image_timeout_ms() -> u64 {
    10_000
}

fn default_max_entry_age_secs() -> u64 {
    retention::MAX_ENTRY_AGE.as_secs()
}

fn default_sweep_interval_secs() -> u64 {
    retention::SWEEP_INTERVAL.as_secs()
}

fn default_image_size_ceiling() -> u64 {
    retention::IMAGE_SIZE_CEILING
}

fn default_notification_title() -> String {
    "Waypoint".into()
}

fn default_notification_icon() -> String {
    "/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icon-72x72.png".into()
}

fn default_vibrate_pattern() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_push_body() -> String {
    "New update available".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            namespace: default_namespace(),
            version: default_version(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            precache_manifest: default_precache_manifest(),
            hold_after_install: false,
            install_attempts: default_install_attempts(),
            font_timeout_ms: default_font_timeout_ms(),
            static_timeout_ms: default_static_timeout_ms(),
            image_timeout_ms: default_image_timeout_ms(),
            max_entry_age_secs: default_max_entry_age_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            image_size_ceiling: default_image_size_ceiling(),
            max_entries_per_partition: None,
            rules: Vec::new(),
            notification_title: default_notification_title(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_badge(),
            vibrate_pattern: default_vibrate_pattern(),
            default_push_body: default_push_body(),
        }
    }
}

impl AppConfig {
    pub fn font_timeout(&self) -> Duration {
        Duration::from_millis(self.font_timeout_ms)
    }

    pub fn static_timeout(&self) -> Duration {
        Duration::from_millis(self.static_timeout_ms)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    pub fn partition_names(&self) -> PartitionNames {
        PartitionNames::new(&self.namespace, &self.version)
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_entry_age: Duration::from_secs(self.max_entry_age_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            image_size_ceiling: self.image_size_ceiling,
            max_entries_per_partition: self.max_entries_per_partition,
        }
    }

    /// Compile the configured rules, or the built-in set when none are given.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a pattern is not a valid regex.
    pub fn classifier(&self) -> Result<Classifier, ConfigError> {
        let rules = if self.rules.is_empty() { default_rules() } else { self.rules.clone() };
        Classifier::from_rules(&rules).map_err(|e| ConfigError::Invalid { field: "rules".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WAYPOINT_`
    /// 2. TOML file from `WAYPOINT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WAYPOINT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WAYPOINT_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

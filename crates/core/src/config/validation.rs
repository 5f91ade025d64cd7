//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `namespace` or `version` is empty or contains whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - any strategy timeout is zero or exceeds 5 minutes
    /// - `sweep_interval_secs` or `max_entry_age_secs` is zero
    /// - `install_attempts` is zero
    /// - a classification rule does not compile
    ///
    /// Returns `ConfigError::Missing` if the precache manifest is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("namespace", &self.namespace), ("version", &self.version)] {
            if value.is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must not contain whitespace"));
            }
        }

        match Url::parse(&self.origin) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("origin", "scheme must be http or https")),
            Err(e) => return Err(invalid("origin", &e.to_string())),
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.precache_manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "precache_manifest".into(),
                hint: "list at least the root document, e.g. [\"/\"]".into(),
            });
        }

        for (field, value) in [
            ("font_timeout_ms", self.font_timeout_ms),
            ("static_timeout_ms", self.static_timeout_ms),
            ("image_timeout_ms", self.image_timeout_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
            if value > 300_000 {
                return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.sweep_interval_secs == 0 {
            return Err(invalid("sweep_interval_secs", "must be greater than 0"));
        }
        if self.max_entry_age_secs == 0 {
            return Err(invalid("max_entry_age_secs", "must be greater than 0"));
        }
        if self.install_attempts == 0 {
            return Err(invalid("install_attempts", "must be at least 1"));
        }

        self.classifier()?;

        if self.max_entries_per_partition == Some(0) {
            tracing::warn!("max_entries_per_partition is 0; every sweep will empty all partitions");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassificationRule, ResourceClass};

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_namespace_whitespace() {
        let config = AppConfig { namespace: "my app".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "namespace"));
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "file:///srv/app".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = AppConfig { font_timeout_ms: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "font_timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { image_timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "image_timeout_ms"));
    }

    #[test]
    fn test_validate_empty_manifest() {
        let config = AppConfig { precache_manifest: Vec::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "precache_manifest"));
    }

    #[test]
    fn test_validate_bad_rule() {
        let config =
            AppConfig { rules: vec![ClassificationRule::new("[", ResourceClass::Script)], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "rules"));
    }

    #[test]
    fn test_validate_zero_install_attempts() {
        let config = AppConfig { install_attempts: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "install_attempts"));
    }
}

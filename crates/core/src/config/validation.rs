//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not http(s)
    /// - `version` is empty or contains whitespace
    /// - any partition limit is 0
    /// - `timeout_ms` / `data_timeout_ms` are below 100ms or above 5 minutes
    /// - `max_bytes` is 0
    /// - `user_agent` is empty
    /// - `geocode_radius_km` is not a positive finite number
    /// - an app-shell entry or the start page resolves off-origin
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.origin.scheme() {
            "http" | "https" => {}
            other => return Err(invalid("origin", format!("unsupported scheme: {other}"))),
        }

        if self.version.is_empty() {
            return Err(invalid("version", "must not be empty"));
        }
        if self.version.chars().any(char::is_whitespace) {
            return Err(invalid("version", "must not contain whitespace"));
        }

        let limits = &self.limits;
        if limits.static_entries == 0 || limits.data_entries == 0 || limits.tile_entries == 0 {
            return Err(invalid("limits", "every partition limit must be greater than 0"));
        }

        for (field, ms) in [("timeout_ms", self.timeout_ms), ("data_timeout_ms", self.data_timeout_ms)] {
            if ms < 100 {
                return Err(invalid(field, "must be at least 100ms"));
            }
            if ms > 300_000 {
                return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !(self.geocode_radius_km.is_finite() && self.geocode_radius_km > 0.0) {
            return Err(invalid("geocode_radius_km", "must be a positive number of kilometres"));
        }

        let origin = self.origin.origin();
        for url in self.app_shell_urls()? {
            if url.origin() != origin {
                return Err(invalid("app_shell", format!("{url} is not same-origin")));
            }
        }
        if self.start_page_url()?.origin() != origin {
            return Err(invalid("start_page", "must be same-origin"));
        }

        if self.data_timeout_ms > self.timeout_ms {
            tracing::warn!(
                data_timeout_ms = self.data_timeout_ms,
                timeout_ms = self.timeout_ms,
                "data_timeout_ms exceeds the client timeout; \
                 the client timeout will fire first"
            );
        }

        Ok(())
    }
}

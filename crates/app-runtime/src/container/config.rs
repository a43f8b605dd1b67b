//! # Application Configuration
//!
//! Aggregates the per-subsystem configs and reads overrides from `CS_*`
//! environment variables.
//!
//! ## Production Requirements
//!
//! - Store-call timeouts MUST stay within 10-15 s
//! - Every retry policy MUST allow at least one attempt

use std::ops::RangeInclusive;
use std::time::Duration;

use companion_telemetry::TelemetryConfig;
use cs_01_session_manager::SessionConfig;
use cs_02_entity_sync::SyncConfig;
use thiserror::Error;

/// Accepted store-call timeout in production mode.
pub const PRODUCTION_STORE_TIMEOUT: RangeInclusive<Duration> =
    Duration::from_secs(10)..=Duration::from_secs(15);

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub sync: SyncConfig,
    pub telemetry: TelemetryConfig,
    /// Enforce production bounds in [`AppConfig::validate`].
    pub production: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            sync: SyncConfig::default(),
            telemetry: TelemetryConfig::default(),
            production: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid value")]
    InvalidValue { var: &'static str, value: String },

    #[error("{setting} store-call timeout {actual:?} is outside 10-15s")]
    StoreTimeoutOutOfRange {
        setting: &'static str,
        actual: Duration,
    },

    #[error("{0} must allow at least one attempt")]
    ZeroAttempts(&'static str),

    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),
}

impl AppConfig {
    /// Short timings, no production bounds, quiet telemetry.
    pub fn for_testing() -> Self {
        Self {
            session: SessionConfig::for_testing(),
            sync: SyncConfig::for_testing(),
            telemetry: TelemetryConfig::for_testing(),
            production: false,
        }
    }

    /// Defaults overridden from the environment, then validated.
    ///
    /// # Environment Variables
    ///
    /// - `CS_PRODUCTION`: enforce production bounds (default: true)
    /// - `CS_INIT_TIMEOUT_MS`: session initialization fallback
    /// - `CS_STORE_TIMEOUT_MS`: bound for every store call
    /// - `CS_EXISTENCE_ATTEMPTS` / `CS_EXISTENCE_BACKOFF_MS`: existence lookups
    /// - `CS_LOAD_ATTEMPTS` / `CS_LOAD_BACKOFF_MS`: synchronizer loads
    ///
    /// Telemetry settings are read by [`TelemetryConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`AppConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            telemetry: TelemetryConfig::from_env(),
            ..Self::default()
        };

        if let Some(value) = lookup("CS_PRODUCTION") {
            config.production = parse_flag("CS_PRODUCTION", &value)?;
        }
        if let Some(ms) = parse_u64(&lookup, "CS_INIT_TIMEOUT_MS")? {
            config.session.init_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, "CS_STORE_TIMEOUT_MS")? {
            config.session.store_call_timeout = Duration::from_millis(ms);
            config.sync.store_call_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_u64(&lookup, "CS_EXISTENCE_ATTEMPTS")? {
            config.session.existence_retry.max_attempts = to_u32("CS_EXISTENCE_ATTEMPTS", attempts)?;
        }
        if let Some(ms) = parse_u64(&lookup, "CS_EXISTENCE_BACKOFF_MS")? {
            config.session.existence_retry.initial_backoff = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_u64(&lookup, "CS_LOAD_ATTEMPTS")? {
            config.sync.load_retry.max_attempts = to_u32("CS_LOAD_ATTEMPTS", attempts)?;
        }
        if let Some(ms) = parse_u64(&lookup, "CS_LOAD_BACKOFF_MS")? {
            config.sync.load_retry.initial_backoff = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the subsystems cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.existence_retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("existence retry"));
        }
        if self.sync.load_retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("load retry"));
        }
        if self.session.init_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("init timeout"));
        }

        let timeouts = [
            ("session", self.session.store_call_timeout),
            ("sync", self.sync.store_call_timeout),
        ];
        for (setting, actual) in timeouts {
            if actual.is_zero() {
                return Err(ConfigError::ZeroDuration("store-call timeout"));
            }
            if self.production && !PRODUCTION_STORE_TIMEOUT.contains(&actual) {
                return Err(ConfigError::StoreTimeoutOutOfRange { setting, actual });
            }
        }
        Ok(())
    }
}

fn parse_u64<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { var, value })
        })
        .transpose()
}

fn to_u32(var: &'static str, value: u64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
        assert!(AppConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_store_timeout_override_applies_to_both_subsystems() {
        let config = AppConfig::from_lookup(lookup(&[("CS_STORE_TIMEOUT_MS", "14000")])).unwrap();
        assert_eq!(config.session.store_call_timeout, Duration::from_secs(14));
        assert_eq!(config.sync.store_call_timeout, Duration::from_secs(14));
    }

    #[test]
    fn test_production_rejects_short_store_timeout() {
        let err = AppConfig::from_lookup(lookup(&[("CS_STORE_TIMEOUT_MS", "2000")])).unwrap_err();
        assert!(matches!(err, ConfigError::StoreTimeoutOutOfRange { .. }));

        let relaxed = AppConfig::from_lookup(lookup(&[
            ("CS_STORE_TIMEOUT_MS", "2000"),
            ("CS_PRODUCTION", "false"),
        ]));
        assert!(relaxed.is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("CS_EXISTENCE_ATTEMPTS", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroAttempts("existence retry"));

        let err = AppConfig::from_lookup(lookup(&[("CS_LOAD_ATTEMPTS", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroAttempts("load retry"));
    }

    #[test]
    fn test_garbage_values_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("CS_INIT_TIMEOUT_MS", "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "CS_INIT_TIMEOUT_MS",
                value: "soon".to_string()
            }
        );
        assert!(AppConfig::from_lookup(lookup(&[("CS_PRODUCTION", "maybe")])).is_err());
    }
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ExporterError;
use crate::util::parse_metric_namespace;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:9995";
pub const DEFAULT_METRIC_NAMESPACE: &str = "nvidia_jetson";
const DEFAULT_INTERVAL_MS: u64 = 1000;
const DEFAULT_CLEANUP_INTERVAL_HOURS: u64 = 1;
const SECONDS_PER_HOUR: u64 = 60 * 60;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the exporter
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address, e.g. `0.0.0.0:9995`
    pub bind_address: String,
    /// tegrastats binary; the known install paths are searched when unset
    pub tegrastats_bin: Option<PathBuf>,
    /// Directory receiving `tegrastats.log`
    pub log_dir: PathBuf,
    /// Sampling interval in milliseconds
    pub interval_ms: u64,
    /// How often the log file is truncated, in hours
    pub cleanup_interval_hours: u64,
    pub metric_namespace: String,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            tegrastats_bin: None,
            log_dir: PathBuf::from("."),
            interval_ms: DEFAULT_INTERVAL_MS,
            cleanup_interval_hours: DEFAULT_CLEANUP_INTERVAL_HOURS,
            metric_namespace: DEFAULT_METRIC_NAMESPACE.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ExporterError> {
        let bind_address =
            env::var("JETSON_BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
        let tegrastats_bin = env::var("JETSON_TEGRASTATS_BIN").ok().map(PathBuf::from);
        let log_dir = env::var("JETSON_TEGRASTATS_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let interval_ms = parse_env("JETSON_TEGRASTATS_INTERVAL", DEFAULT_INTERVAL_MS)?;
        let cleanup_interval_hours = parse_env(
            "JETSON_LOGFILE_CLEANUP_INTERVAL_HOURS",
            DEFAULT_CLEANUP_INTERVAL_HOURS,
        )?;
        let metric_namespace = env::var("JETSON_METRIC_NAMESPACE")
            .ok()
            .and_then(|val| parse_metric_namespace(&val))
            .unwrap_or_else(|| DEFAULT_METRIC_NAMESPACE.to_string());
        let log_level = env::var("JETSON_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            bind_address,
            tegrastats_bin,
            log_dir,
            interval_ms,
            cleanup_interval_hours,
            metric_namespace,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExporterError> {
        self.socket_addr()?;

        if self.interval_ms == 0 {
            return Err(ExporterError::InvalidConfig(
                "JETSON_TEGRASTATS_INTERVAL must be greater than 0".to_string(),
            ));
        }

        if self.cleanup_interval_hours == 0 {
            return Err(ExporterError::InvalidConfig(
                "JETSON_LOGFILE_CLEANUP_INTERVAL_HOURS must be greater than 0".to_string(),
            ));
        }

        if self
            .cleanup_interval_hours
            .checked_mul(SECONDS_PER_HOUR)
            .is_none()
        {
            return Err(ExporterError::InvalidConfig(format!(
                "JETSON_LOGFILE_CLEANUP_INTERVAL_HOURS must be at most {}",
                u64::MAX / SECONDS_PER_HOUR
            )));
        }

        if parse_metric_namespace(&self.metric_namespace).is_none() {
            return Err(ExporterError::InvalidConfig(format!(
                "Invalid metric namespace '{}'",
                self.metric_namespace
            )));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ExporterError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ExporterError> {
        self.bind_address.parse().map_err(|e| {
            ExporterError::InvalidConfig(format!(
                "Invalid bind address '{}': {e}",
                self.bind_address
            ))
        })
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_hours.saturating_mul(SECONDS_PER_HOUR))
    }
}

/// Reads a numeric variable, using `default` when it is unset.
fn parse_env<T>(name: &str, default: T) -> Result<T, ExporterError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.trim().parse().map_err(|e| {
            ExporterError::InvalidConfig(format!("{name} must be a number, got '{val}': {e}"))
        }),
        Err(_) => Ok(default),
    }
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use tegrastats::errors::SamplerError;

/// Errors that can occur while exporting tegrastats metrics
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to register metric: {0}")]
    Registration(#[source] prometheus::Error),

    #[error("Failed to encode metrics: {0}")]
    Encode(#[source] prometheus::Error),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ExporterError::InvalidConfig("interval must be positive".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: interval must be positive"
        );

        let error = ExporterError::from(SamplerError::AlreadyStarted);
        assert_eq!(error.to_string(), "tegrastats is already running");
    }

    #[test]
    fn test_error_debug() {
        let error = ExporterError::Encode(prometheus::Error::Msg("bad".to_string()));
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Encode"));
    }
}

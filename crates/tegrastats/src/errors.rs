// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Errors raised while driving the external `tegrastats` process.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("tegrastats binary not found in any of: {0}")]
    BinaryNotFound(String),

    #[error("tegrastats is already running")]
    AlreadyStarted,

    #[error("Failed to spawn {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to stop tegrastats: {0}")]
    Stop(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SamplerError::BinaryNotFound("/usr/bin/tegrastats".to_string());
        assert_eq!(
            error.to_string(),
            "tegrastats binary not found in any of: /usr/bin/tegrastats"
        );

        let error = SamplerError::Io {
            path: PathBuf::from("/tmp/tegrastats.log"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(error.to_string(), "I/O error on /tmp/tegrastats.log: gone");
    }
}

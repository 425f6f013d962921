// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Parses and validates a Prometheus metric namespace.
///
/// A valid namespace:
/// - Must not be empty after trimming whitespace
/// - Must start with an ASCII letter
/// - May only contain ASCII alphanumerics and underscores
///
/// # Examples
///
/// ```
/// use jetson_exporter::util::parse_metric_namespace;
///
/// assert_eq!(parse_metric_namespace("nvidia_jetson"), Some("nvidia_jetson".to_string()));
/// assert_eq!(parse_metric_namespace("1invalid"), None);
/// assert_eq!(parse_metric_namespace("my.app"), None);
/// ```
pub fn parse_metric_namespace(namespace: &str) -> Option<String> {
    let trimmed = namespace.trim();
    let mut chars = trimmed.chars();

    let first_char = chars.next()?;
    if !first_char.is_ascii_alphabetic() {
        tracing::error!(
            "JETSON_METRIC_NAMESPACE must start with a letter, got: '{}'. Ignoring namespace.",
            trimmed
        );
        return None;
    }

    if let Some(invalid_char) = chars.find(|&ch| !ch.is_ascii_alphanumeric() && ch != '_') {
        tracing::error!(
            "JETSON_METRIC_NAMESPACE contains invalid character '{}' in '{}'. Only ASCII alphanumerics and underscores are allowed. Ignoring namespace.",
            invalid_char, trimmed
        );
        return None;
    }

    Some(trimmed.to_string())
}

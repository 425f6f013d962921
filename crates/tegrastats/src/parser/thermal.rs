// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Temperatures: any `<sensor>@<degrees>C` token, so new sensor names need no code change.

use std::collections::BTreeMap;

use super::number_or_default;
use super::patterns::TEMPERATURE;

/// Returns degrees Celsius keyed by sensor name. A repeated sensor keeps its last value.
pub fn parse_temperatures(line: &str) -> BTreeMap<String, f64> {
    TEMPERATURE
        .captures_iter(line)
        .map(|caps| {
            let degrees: f64 = number_or_default("temperature", &caps[2]);
            (caps[1].to_string(), degrees)
        })
        .collect()
}

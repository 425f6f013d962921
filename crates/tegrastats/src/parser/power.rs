// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Voltage rails: `VDD_<NAME> current/average`, in milliwatts.

use std::collections::BTreeMap;

use super::number_or_default;
use super::patterns::VDD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RailReading {
    /// Position among the rails of the line. Only used to tell rails apart.
    pub index: usize,
    pub name: String,
    /// Instantaneous draw
    pub current: u64,
    /// Running average since the sampler started
    pub average: u64,
}

pub fn parse_rails(line: &str) -> BTreeMap<String, RailReading> {
    VDD.captures_iter(line)
        .enumerate()
        .map(|(index, caps)| {
            let name = caps[1].to_string();
            let reading = RailReading {
                index,
                name: name.clone(),
                current: number_or_default("rail current", &caps[2]),
                average: number_or_default("rail average", &caps[3]),
            };
            (name, reading)
        })
        .collect()
}

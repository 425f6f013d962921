// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CPU section.
//!
//! ```text
//! CPU [X%@Z,Y%@Z,off,...]   per-core load relative to the core's current frequency Z (MHz)
//! CPU [X%,Y%,off,...]@Z     older layout, one frequency for every core
//! ```
//!
//! `off` marks a powered-down core. Loads are rough approximations derived from the idle time
//! in `/proc/stat`.

use std::collections::BTreeMap;
use tracing::debug;

use super::patterns::{CPU, CPU_ENTRY};
use super::{number_or_default, optional_number};
use crate::governor::{GovernorLookup, GovernorReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreReading {
    pub index: usize,
    pub online: bool,
    /// Load in percent; `None` for offline cores
    pub load: Option<u32>,
    /// Frequency in MHz; `None` for offline cores or when the line carries none
    pub frequency: Option<u32>,
    /// Scaling governor name; `None` for offline cores or when it could not be read
    pub governor: Option<String>,
}

impl CoreReading {
    fn offline(index: usize) -> Self {
        Self {
            index,
            online: false,
            load: None,
            frequency: None,
            governor: None,
        }
    }
}

/// Extracts one reading per core of the `CPU [...]` group, in core order.
///
/// Every online core is enriched with its scaling governor. When `governors` reports that the
/// platform has no governor for a core index, extraction stops there: that core and every later
/// one are left out and the cores read so far are returned.
pub fn parse_cpus(line: &str, governors: &dyn GovernorReader) -> BTreeMap<usize, CoreReading> {
    let mut cores = BTreeMap::new();
    let Some(caps) = CPU.captures(line) else {
        return cores;
    };
    let group = caps.get(1).map_or("", |m| m.as_str());
    if group.trim().is_empty() {
        return cores;
    }
    let shared_frequency: Option<u32> =
        optional_number("CPU frequency", caps.get(2).map(|m| m.as_str()));

    for (index, entry) in group.split(',').enumerate() {
        let entry = entry.trim();
        if entry == "off" {
            cores.insert(index, CoreReading::offline(index));
            continue;
        }

        let (load, frequency) = match CPU_ENTRY.captures(entry) {
            Some(entry_caps) => (
                number_or_default("CPU load", &entry_caps[1]),
                optional_number("CPU frequency", entry_caps.get(2).map(|m| m.as_str()))
                    .or(shared_frequency),
            ),
            None => {
                debug!("Malformed CPU entry {entry:?} for core {index}, defaulting to zero");
                (0, Some(shared_frequency.unwrap_or_default()))
            }
        };

        let governor = match governors.read(index) {
            GovernorLookup::Unsupported => {
                debug!("No scaling governor for core {index}, skipping remaining cores");
                break;
            }
            GovernorLookup::Unreadable => None,
            GovernorLookup::Found(name) if name.is_empty() => None,
            GovernorLookup::Found(name) => Some(name),
        };

        cores.insert(
            index,
            CoreReading {
                index,
                online: true,
                load: Some(load),
                frequency,
                governor,
            },
        );
    }
    cores
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Extractors turning one `tegrastats` line into typed readings.
//!
//! A line is a sequence of space-separated sections, each introduced by a tag:
//!
//! ```text
//! RAM 1728/7763MB (lfb 1117x4MB) SWAP 0/3882MB (cached 0MB) CPU [5%@1190,off] EMC_FREQ 0%
//! GR3D_FREQ 0% AO@35.5C GPU@35.5C VDD_IN 3757/3757 MTS fg 12% bg 13% GR3D 14%@36
//! ```
//!
//! Each extractor looks for its own tag anywhere in the line and never fails: a missing tag
//! yields `None` or an empty map, and a number that does not parse within a matched section
//! degrades to zero for that field only.

mod cpu;
mod engine;
mod memory;
mod patterns;
mod power;
mod thermal;

use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use crate::governor::GovernorReader;

pub use cpu::{parse_cpus, CoreReading};
pub use engine::{
    parse_emc_freq, parse_gr3d, parse_gr3d_freq, parse_mts, FrequencyDomainReading,
    SchedulerLoad,
};
pub use memory::{
    megabytes, parse_iram, parse_ram, parse_swap, LargestFreeBlock, MemoryRegion, Quantity,
};
pub use power::{parse_rails, RailReading};
pub use thermal::parse_temperatures;

/// Everything extracted from one line. Every category is independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub ram: Option<MemoryRegion>,
    pub iram: Option<MemoryRegion>,
    pub swap: Option<MemoryRegion>,
    /// Keyed by core index
    pub cpus: BTreeMap<usize, CoreReading>,
    /// Keyed by the rail name following `VDD_`
    pub rails: BTreeMap<String, RailReading>,
    /// Degrees Celsius keyed by sensor name
    pub temperatures: BTreeMap<String, f64>,
    pub gr3d_freq: Option<FrequencyDomainReading>,
    pub emc_freq: Option<FrequencyDomainReading>,
    pub gr3d: Option<FrequencyDomainReading>,
    pub mts: Option<SchedulerLoad>,
}

impl Snapshot {
    /// True when no section at all was recognized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ram.is_none()
            && self.iram.is_none()
            && self.swap.is_none()
            && self.cpus.is_empty()
            && self.rails.is_empty()
            && self.temperatures.is_empty()
            && self.gr3d_freq.is_none()
            && self.emc_freq.is_none()
            && self.gr3d.is_none()
            && self.mts.is_none()
    }
}

/// Runs every extractor over `line`.
pub fn parse(line: &str, governors: &dyn GovernorReader) -> Snapshot {
    let snapshot = Snapshot {
        ram: parse_ram(line),
        iram: parse_iram(line),
        swap: parse_swap(line),
        cpus: parse_cpus(line, governors),
        rails: parse_rails(line),
        temperatures: parse_temperatures(line),
        gr3d_freq: parse_gr3d_freq(line),
        emc_freq: parse_emc_freq(line),
        gr3d: parse_gr3d(line),
        mts: parse_mts(line),
    };
    if snapshot.is_empty() && !line.trim().is_empty() {
        debug!("No tegrastats section recognized in line: {line}");
    }
    snapshot
}

/// Parses a numeric sub-field, falling back to the type's default when it is malformed.
pub(crate) fn number_or_default<T>(field: &str, text: &str) -> T
where
    T: FromStr + Default,
{
    match text.parse() {
        Ok(value) => value,
        Err(_) => {
            debug!("Malformed {field} value {text:?}, defaulting to zero");
            T::default()
        }
    }
}

/// Like [`number_or_default`], but an empty capture means the field is absent.
pub(crate) fn optional_number<T>(field: &str, text: Option<&str>) -> Option<T>
where
    T: FromStr + Default,
{
    match text {
        Some(text) if !text.is_empty() => Some(number_or_default(field, text)),
        _ => None,
    }
}

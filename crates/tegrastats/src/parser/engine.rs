// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Frequency domains (GPU and external memory controller) and the memory transaction
//! scheduler.
//!
//! ```text
//! EMC_FREQ X%@Y      X percent of the EMC bandwidth in use, Y its frequency in MHz
//! GR3D_FREQ X%@Y     GPU load and frequency; `@Y` is missing while the GPU is idle
//! GR3D X%[@Y]        standalone GPU reading of older releases
//! MTS fg X% bg Y%    foreground and background share of the transaction scheduler
//! ```

use regex::Regex;

use super::patterns::{EMC_FREQ, GR3D, GR3D_FREQ, MTS};
use super::{number_or_default, optional_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyDomainReading {
    /// Percent
    pub utilization: u32,
    /// MHz, absent when the domain is idle
    pub frequency: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerLoad {
    /// Percent
    pub foreground: u32,
    /// Percent
    pub background: u32,
}

pub fn parse_gr3d_freq(line: &str) -> Option<FrequencyDomainReading> {
    frequency_domain(&GR3D_FREQ, line)
}

pub fn parse_emc_freq(line: &str) -> Option<FrequencyDomainReading> {
    frequency_domain(&EMC_FREQ, line)
}

pub fn parse_gr3d(line: &str) -> Option<FrequencyDomainReading> {
    frequency_domain(&GR3D, line)
}

pub fn parse_mts(line: &str) -> Option<SchedulerLoad> {
    let caps = MTS.captures(line)?;
    Some(SchedulerLoad {
        foreground: number_or_default("MTS foreground", &caps[1]),
        background: number_or_default("MTS background", &caps[2]),
    })
}

/// Shared by every pattern whose first group is the utilization and whose optional second group
/// is the frequency.
fn frequency_domain(pattern: &Regex, line: &str) -> Option<FrequencyDomainReading> {
    let caps = pattern.captures(line)?;
    Some(FrequencyDomainReading {
        utilization: number_or_default("utilization", &caps[1]),
        frequency: optional_number("frequency", caps.get(2).map(|m| m.as_str())),
    })
}

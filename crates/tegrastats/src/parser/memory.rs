// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! RAM, IRAM and SWAP sections.
//!
//! ```text
//! RAM X/Y (lfb NxZ)     X used, Y total, N free blocks of the largest free size Z
//! IRAM X/Y (lfb Z)      memory local to the video engine, Z largest free block
//! SWAP X/Y (cached Z)   Z swap cached
//! ```
//!
//! Sizes carry a unit letter in front of `B` (`k`, `M` or `G`).

use regex::Captures;
use tracing::warn;

use super::number_or_default;
use super::patterns::{IRAM, RAM, SWAP};

/// A size as printed, e.g. `4MB` is `{ value: 4, unit: "M" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantity {
    pub value: u64,
    pub unit: String,
}

/// Largest free block statistic of the memory allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargestFreeBlock {
    /// Number of free blocks of `size`; only reported for RAM.
    pub count: Option<u64>,
    pub size: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub used: u64,
    pub total: u64,
    /// Unit letter shared by `used` and `total`
    pub unit: String,
    pub largest_free_block: Option<LargestFreeBlock>,
    pub cached: Option<Quantity>,
}

pub fn parse_ram(line: &str) -> Option<MemoryRegion> {
    let caps = RAM.captures(line)?;
    let mut region = region_from(&caps, "RAM");
    region.largest_free_block = Some(LargestFreeBlock {
        count: Some(number_or_default("RAM lfb count", &caps[4])),
        size: Quantity {
            value: number_or_default("RAM lfb size", &caps[5]),
            unit: caps[6].to_string(),
        },
    });
    Some(region)
}

pub fn parse_iram(line: &str) -> Option<MemoryRegion> {
    let caps = IRAM.captures(line)?;
    let mut region = region_from(&caps, "IRAM");
    region.largest_free_block = Some(LargestFreeBlock {
        count: None,
        size: Quantity {
            value: number_or_default("IRAM lfb size", &caps[4]),
            unit: caps[5].to_string(),
        },
    });
    Some(region)
}

pub fn parse_swap(line: &str) -> Option<MemoryRegion> {
    let caps = SWAP.captures(line)?;
    let mut region = region_from(&caps, "SWAP");
    region.cached = Some(Quantity {
        value: number_or_default("SWAP cached", &caps[4]),
        unit: caps[5].to_string(),
    });
    Some(region)
}

/// Reads the `used/totalXB` prefix shared by every memory section (capture groups 1 to 3).
fn region_from(caps: &Captures<'_>, tag: &str) -> MemoryRegion {
    let used: u64 = number_or_default("used", &caps[1]);
    let total: u64 = number_or_default("total", &caps[2]);
    if used > total {
        warn!("{tag} reports {used} used out of {total} total");
    }
    MemoryRegion {
        used,
        total,
        unit: caps[3].to_string(),
        largest_free_block: None,
        cached: None,
    }
}

/// Converts a size printed with `unit` into megabytes. Unknown unit letters are returned
/// unscaled.
#[must_use]
pub fn megabytes(value: u64, unit: &str) -> f64 {
    let value = value as f64;
    match unit {
        "k" | "K" => value / 1024.0,
        "G" => value * 1024.0,
        _ => value,
    }
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CPU frequency governor lookup and normalization.
//!
//! `tegrastats` does not report the scaling governor, so it is read per core from sysfs:
//!
//! ```text
//! /sys/devices/system/cpu/
//!   └── cpu<N>/cpufreq/scaling_governor   # e.g. "schedutil\n"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root of the per-core sysfs directories.
pub const SYSFS_CPU_PATH: &str = "/sys/devices/system/cpu";

/// Ordinal reported for a governor name outside the known set.
pub const UNKNOWN_GOVERNOR_ORDINAL: i64 = -1;

/// CPU frequency scaling policy, with a fixed ordinal per named policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Governor {
    /// Frequency driven by the scheduler's utilization signal
    Schedutil,
    /// Pinned to the maximum frequency
    Performance,
    /// Pinned to the minimum frequency
    Powersave,
    /// Frequency chosen by a userspace program
    Userspace,
    Ondemand,
    Conservative,
    /// Vendor kernel variant of ondemand/conservative
    Smartass,
    /// Vendor kernel variant that also unplugs idle cores
    Hotplug,
    Unknown,
}

impl Governor {
    pub const NAMED: [Governor; 8] = [
        Governor::Schedutil,
        Governor::Performance,
        Governor::Powersave,
        Governor::Userspace,
        Governor::Ondemand,
        Governor::Conservative,
        Governor::Smartass,
        Governor::Hotplug,
    ];

    /// Maps a sysfs governor name to a `Governor`. Matching ignores case and surrounding
    /// whitespace; anything else is [`Governor::Unknown`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "schedutil" => Governor::Schedutil,
            "performance" => Governor::Performance,
            "powersave" => Governor::Powersave,
            "userspace" => Governor::Userspace,
            "ondemand" => Governor::Ondemand,
            "conservative" => Governor::Conservative,
            "smartass" => Governor::Smartass,
            "hotplug" => Governor::Hotplug,
            _ => Governor::Unknown,
        }
    }

    #[must_use]
    pub fn ordinal(self) -> i64 {
        match self {
            Governor::Schedutil => 0,
            Governor::Performance => 1,
            Governor::Powersave => 2,
            Governor::Userspace => 3,
            Governor::Ondemand => 4,
            Governor::Conservative => 5,
            Governor::Smartass => 6,
            Governor::Hotplug => 7,
            Governor::Unknown => UNKNOWN_GOVERNOR_ORDINAL,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Governor::Schedutil => "schedutil",
            Governor::Performance => "performance",
            Governor::Powersave => "powersave",
            Governor::Userspace => "userspace",
            Governor::Ondemand => "ondemand",
            Governor::Conservative => "conservative",
            Governor::Smartass => "smartass",
            Governor::Hotplug => "hotplug",
            Governor::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Governor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of looking up the governor of one core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernorLookup {
    /// The platform exposes no governor for this core index.
    Unsupported,
    /// The governor file exists but could not be read.
    Unreadable,
    Found(String),
}

/// Source of per-core governor names.
pub trait GovernorReader: Send + Sync {
    fn read(&self, core: usize) -> GovernorLookup;
}

/// Reads `cpu<N>/cpufreq/scaling_governor` below a sysfs root.
#[derive(Debug, Clone)]
pub struct SysfsGovernorReader {
    root: PathBuf,
}

impl SysfsGovernorReader {
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(SYSFS_CPU_PATH)
    }

    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn governor_path(&self, core: usize) -> PathBuf {
        self.root
            .join(format!("cpu{core}"))
            .join("cpufreq")
            .join("scaling_governor")
    }
}

impl Default for SysfsGovernorReader {
    fn default() -> Self {
        Self::new()
    }
}

impl GovernorReader for SysfsGovernorReader {
    fn read(&self, core: usize) -> GovernorLookup {
        let path = self.governor_path(core);
        if !path.is_file() {
            debug!("No scaling governor at {}", path.display());
            return GovernorLookup::Unsupported;
        }
        match fs::read_to_string(&path) {
            Ok(contents) => GovernorLookup::Found(contents.trim().to_string()),
            Err(e) => {
                debug!("Could not read scaling governor from {}: {e}", path.display());
                GovernorLookup::Unreadable
            }
        }
    }
}

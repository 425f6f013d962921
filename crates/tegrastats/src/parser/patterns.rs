// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Section patterns for one `tegrastats` line.
//!
//! Every tag is anchored on a word boundary so that `RAM` does not match inside `IRAM`, and
//! `GR3D` does not match `GR3D_FREQ` (the underscore is a word character).

#![allow(clippy::expect_used)]

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `RAM used/totalXB (lfb NxSIZEYB)`, with the space before `(` optional.
    pub(crate) static ref RAM: Regex =
        Regex::new(r"\bRAM (\d+)/(\d+)(\w)B ?\(lfb (\d+)x(\d+)(\w)B\)")
            .expect("failed creating regex");

    /// `IRAM used/totalXB (lfb SIZEYB)`, e.g. `IRAM 0/252kB(lfb 252kB)`.
    pub(crate) static ref IRAM: Regex =
        Regex::new(r"\bIRAM (\d+)/(\d+)(\w)B ?\(lfb (\d+)(\w)B\)")
            .expect("failed creating regex");

    /// `SWAP used/totalXB (cached CACHEDYB)`.
    pub(crate) static ref SWAP: Regex =
        Regex::new(r"\bSWAP (\d+)/(\d+)(\w)B ?\(cached (\d+)(\w)B\)")
            .expect("failed creating regex");

    /// `CPU [entry,entry,...]` with an optional shared `@freq` after the bracket.
    pub(crate) static ref CPU: Regex =
        Regex::new(r"\bCPU \[([^\]]*)\](?:@(\d+))?").expect("failed creating regex");

    /// One online core entry: `load%` or `load%@freq`.
    pub(crate) static ref CPU_ENTRY: Regex =
        Regex::new(r"^(\d+)%(?:@(\d+))?$").expect("failed creating regex");

    /// `VDD_<NAME> current/average`, each value optionally suffixed with `mW`.
    pub(crate) static ref VDD: Regex =
        Regex::new(r"\bVDD_([A-Za-z0-9_]+) (\d+)(?:mW)?/(\d+)(?:mW)?")
            .expect("failed creating regex");

    /// `<sensor>@<signed decimal>C`.
    pub(crate) static ref TEMPERATURE: Regex =
        Regex::new(r"\b(\w+)@(-?[0-9.]+)C\b").expect("failed creating regex");

    /// `GR3D_FREQ util%`, `GR3D_FREQ util%@freq` or `GR3D_FREQ util%@[freq,...]`.
    pub(crate) static ref GR3D_FREQ: Regex =
        Regex::new(r"\bGR3D_FREQ (\d*)%(?:@\[?(\d*))?").expect("failed creating regex");

    /// `EMC_FREQ util%` or `EMC_FREQ util%@freq`.
    pub(crate) static ref EMC_FREQ: Regex =
        Regex::new(r"\bEMC_FREQ (\d*)%(?:@\[?(\d*))?").expect("failed creating regex");

    /// `GR3D util%` or `GR3D util%@freq`.
    pub(crate) static ref GR3D: Regex =
        Regex::new(r"\bGR3D (\d*)%(?:@(\d*))?").expect("failed creating regex");

    /// `MTS fg a% bg b%`.
    pub(crate) static ref MTS: Regex =
        Regex::new(r"\bMTS fg (\d+)% bg (\d+)%").expect("failed creating regex");
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parsing and process plumbing for NVIDIA Jetson `tegrastats` output.
//!
//! `tegrastats` prints one line of space-separated, tag-introduced sections per sampling
//! interval. The [`parser`] module turns such a line into a typed [`parser::Snapshot`],
//! tolerating absent sections and malformed numbers. The [`sampler`] module owns the external
//! `tegrastats` process and hands out the most recent line it wrote.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod errors;
pub mod governor;
pub mod parser;
pub mod sampler;

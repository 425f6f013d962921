// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use tegrastats::governor::GovernorReader;
use tegrastats::parser;
use tegrastats::sampler::SampleSource;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ExporterError;
use crate::metrics::TegrastatsMetrics;

/// Turns the latest sample into an encoded metrics payload.
///
/// The gauge set stays locked from reading the sample until the payload is encoded, so
/// concurrent scrapes never observe a partially projected snapshot.
pub struct Scraper {
    source: Arc<dyn SampleSource>,
    governors: Box<dyn GovernorReader>,
    metrics: Mutex<TegrastatsMetrics>,
}

impl Scraper {
    pub fn new(
        source: Arc<dyn SampleSource>,
        governors: Box<dyn GovernorReader>,
        metrics: TegrastatsMetrics,
    ) -> Self {
        Self {
            source,
            governors,
            metrics: Mutex::new(metrics),
        }
    }

    pub async fn scrape(&self) -> Result<Vec<u8>, ExporterError> {
        let metrics = self.metrics.lock().await;

        // Blocking reads of one log tail and a few sysfs files; short enough to run inline.
        let line = self.source.read_latest().unwrap_or_else(|| {
            debug!("No tegrastats sample available yet");
            String::new()
        });
        let snapshot = parser::parse(&line, self.governors.as_ref());
        metrics.project(&snapshot);
        metrics.encode()
    }
}

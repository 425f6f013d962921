// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use jetson_exporter::{
    config::Config, metrics::TegrastatsMetrics, scraper::Scraper, server::MetricsServer,
};
use tegrastats::{
    governor::SysfsGovernorReader,
    sampler::{self, Tegrastats},
};

#[tokio::main]
pub async fn main() {
    let log_level = std::env::var("JETSON_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("hyper=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!(
        "Starting jetson-exporter {} on {}/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    let config = match Config::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Error creating config on jetson-exporter startup: {e}");
            return;
        }
    };
    debug!("Configuration: {config:?}");

    let binary = match config.tegrastats_bin.clone() {
        Some(binary) => binary,
        None => match sampler::locate_binary() {
            Ok(binary) => binary,
            Err(e) => {
                error!("{e}. Set JETSON_TEGRASTATS_BIN to its location.");
                return;
            }
        },
    };
    let tegrastats = Arc::new(Tegrastats::new(binary, &config.log_dir));
    if let Err(e) = tegrastats.start(config.interval()) {
        error!("Unable to start tegrastats: {e}");
        return;
    }

    let metrics = match TegrastatsMetrics::new(&config.metric_namespace) {
        Ok(metrics) => metrics,
        Err(e) => {
            error!("Unable to create metrics: {e}");
            stop_sampler(&tegrastats);
            return;
        }
    };
    let scraper = Arc::new(Scraper::new(
        tegrastats.clone(),
        Box::new(SysfsGovernorReader::new()),
        metrics,
    ));

    let cancel_token = CancellationToken::new();
    let server = MetricsServer {
        config: Arc::clone(&config),
        scraper,
    };
    let server_cancel = cancel_token.clone();
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.start(server_cancel).await {
            error!("Error when running metrics server: {e}");
        }
    });

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            error!("Unable to install signal handlers: {e}");
            cancel_token.cancel();
            stop_sampler(&tegrastats);
            return;
        }
    };

    let mut cleanup_interval = interval(config.cleanup_interval());
    cleanup_interval.tick().await; // discard first tick, which is instantaneous

    loop {
        tokio::select! {
            _ = cleanup_interval.tick() => {
                debug!("Cleaning up {}", tegrastats.log_file().display());
                if let Err(e) = tegrastats.truncate_log() {
                    error!("Log cleanup failed: {e}");
                }
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
                break;
            }
            _ = &mut server_handle => {
                error!("Metrics server stopped unexpectedly");
                break;
            }
        }
    }

    cancel_token.cancel();
    stop_sampler(&tegrastats);
    info!("jetson-exporter stopped");
}

fn stop_sampler(tegrastats: &Tegrastats) {
    if let Err(e) = tegrastats.stop() {
        error!("Error stopping tegrastats: {e}");
    }
}

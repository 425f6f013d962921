// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{http, Method, Request, Response, StatusCode};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::ExporterError;
use crate::http_utils::{create_http_response, log_and_create_http_response, HttpResponse};
use crate::metrics::CONTENT_TYPE;
use crate::scraper::Scraper;

pub const METRICS_ENDPOINT_PATH: &str = "/metrics";
const INDEX_PATH: &str = "/";

const INDEX_PAGE: &str = "<html>
<head><title>Jetson Exporter</title></head>
<body>
<h1>Jetson Exporter</h1>
<p><a href=\"/metrics\">Metrics</a></p>
</body>
</html>
";

pub struct MetricsServer {
    pub config: Arc<Config>,
    pub scraper: Arc<Scraper>,
}

impl MetricsServer {
    /// Binds the configured address and serves until `cancel` fires.
    pub async fn start(&self, cancel: CancellationToken) -> Result<(), ExporterError> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        info!(
            "Serving metrics on http://{}{}",
            listener.local_addr()?,
            METRICS_ENDPOINT_PATH
        );
        Self::serve(listener, Arc::clone(&self.scraper), cancel).await
    }

    /// Serves metrics on an already bound listener.
    pub async fn serve(
        listener: TcpListener,
        scraper: Arc<Scraper>,
        cancel: CancellationToken,
    ) -> Result<(), ExporterError> {
        let service = service_fn(move |req| {
            let scraper = Arc::clone(&scraper);
            Self::endpoint_handler(req, scraper)
        });
        Self::serve_tcp(listener, service, cancel).await
    }

    async fn serve_tcp<S>(
        listener: TcpListener,
        service: S,
        cancel: CancellationToken,
    ) -> Result<(), ExporterError>
    where
        S: hyper::service::Service<Request<Incoming>, Response = HttpResponse>
            + Clone
            + Send
            + 'static,
        S::Future: Send,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let conn = tokio::select! {
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
                () = cancel.cancelled() => {
                    info!("Metrics server shutting down");
                    return Ok(());
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    error!("Connection error: {e}");
                }
            });
        }
    }

    async fn endpoint_handler(
        req: Request<Incoming>,
        scraper: Arc<Scraper>,
    ) -> http::Result<HttpResponse> {
        match (req.method(), req.uri().path()) {
            (&Method::GET, METRICS_ENDPOINT_PATH) => {
                let now = Instant::now();
                match scraper.scrape().await {
                    Ok(body) => {
                        debug!("Scrape took {} ms", now.elapsed().as_millis());
                        create_http_response(StatusCode::OK, CONTENT_TYPE, body)
                    }
                    Err(err) => log_and_create_http_response(
                        &format!("Error scraping metrics: {err}"),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    ),
                }
            }
            (_, METRICS_ENDPOINT_PATH) => log_and_create_http_response(
                &format!("Method {} not allowed on {METRICS_ENDPOINT_PATH}", req.method()),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
            (&Method::GET, INDEX_PATH) => {
                create_http_response(StatusCode::OK, "text/html; charset=utf-8", INDEX_PAGE)
            }
            _ => {
                let mut not_found = Response::default();
                *not_found.status_mut() = StatusCode::NOT_FOUND;
                Ok(not_found)
            }
        }
    }
}

// HTTP server module: a request pipeline wired to the per-severity logger
// Every request gets its own context carrying the request id

use crate::config::AppConfig;
use crate::context::{ContextStore, RequestContext};
use crate::logger::Logger;
use crate::value::LogValue;
use crate::{log_error, log_info, log_warning};
use anyhow::{Context, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Context key the request id is stored under.
pub const REQUEST_ID_KEY: &str = "X-Request-Id";

/// Put the request id in `ctx`: the incoming `X-Request-Id` header when it is
/// non-empty, otherwise a fresh UUID v4. Returns the id used.
pub fn assign_request_id(headers: &HeaderMap, ctx: &mut dyn ContextStore) -> String {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    ctx.set(REQUEST_ID_KEY, LogValue::from(request_id.as_str()));
    request_id
}

/// Log the request at the severity its outcome calls for and build the response.
pub fn respond<B>(request: &Request<B>, logger: &Logger) -> Response<Full<Bytes>> {
    let mut ctx = RequestContext::new();
    let request_id = assign_request_id(request.headers(), &mut ctx);
    let method = request.method();
    let path = request.uri().path();

    let (status, body) = if *method != Method::GET {
        log_warning!(logger, Some(&ctx), "method not allowed: ", method.as_str(), " ", path);
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n")
    } else if path == "/error" {
        log_error!(logger, Some(&ctx), "request failed: ", path);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error\n")
    } else {
        log_info!(logger, Some(&ctx), "request received: ", method.as_str(), " ", path);
        (StatusCode::OK, "ok\n")
    };

    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub struct LogServer {
    config: AppConfig,
    logger: Arc<Logger>,
}

impl LogServer {
    pub fn new(config: AppConfig, logger: Arc<Logger>) -> Self {
        LogServer { config, logger }
    }

    pub async fn run(&self) -> Result<()> {
        let bind_addr = format!("{}:{}", self.config.server_bind_address, self.config.server_port);

        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;

        tracing::info!(address = %bind_addr, "HTTP server listening");

        self.serve(listener).await
    }

    /// Accept loop; one task per connection.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    tracing::debug!(peer = %peer_addr, "Connection established");

                    let logger = Arc::clone(&self.logger);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, logger).await {
                            tracing::warn!(
                                peer = %peer_addr,
                                error = %e,
                                "Connection handling error"
                            );
                        }

                        tracing::debug!(peer = %peer_addr, "Connection closed");
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, logger: Arc<Logger>) -> Result<()> {
    let service = service_fn(move |request| {
        let logger = Arc::clone(&logger);
        async move { Ok::<_, Infallible>(respond(&request, &logger)) }
    });

    http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .await
        .context("Failed to serve HTTP connection")?;

    Ok(())
}

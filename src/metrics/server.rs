//! HTTP exporter for the filter metrics.
//!
//! Serves `/metrics` in Prometheus text format and `/health` as a plain
//! liveness line.

use super::{MetricsError, MetricsRegistry};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::cors::CorsLayer;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors raised while serving metrics.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind metrics listener: {0}")]
    Bind(#[from] std::io::Error),
    #[error("metrics server failed: {0}")]
    Serve(String),
}

/// Listener settings of the exporter.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9898)
    }
}

impl MetricsServerConfig {
    /// Listens on the loopback interface at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], port).into(),
        }
    }
}

/// Exposes a [`MetricsRegistry`] over HTTP.
///
/// The server holds a clone of the registry; updates made through any
/// other clone are visible on the next scrape.
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: MetricsRegistry,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self { config, registry }
    }

    /// Routes served by the exporter.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(scrape))
            .route("/health", get(health))
            .layer(CorsLayer::permissive())
            .with_state(self.registry.clone())
    }

    /// Serves until the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Metrics exporter listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))
    }
}

async fn scrape(State(registry): State<MetricsRegistry>) -> Response {
    match registry.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => encode_failure(e).into_response(),
    }
}

fn encode_failure(e: MetricsError) -> (StatusCode, String) {
    tracing::warn!(error = %e, "Metrics scrape failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn health(State(registry): State<MetricsRegistry>) -> (StatusCode, String) {
    (StatusCode::OK, health_line(&registry))
}

fn health_line(registry: &MetricsRegistry) -> String {
    format!("ok frames={}", registry.frames_processed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSnapshot;

    #[test]
    fn test_default_binds_loopback() {
        let config = MetricsServerConfig::default();
        assert_eq!(config.bind_addr.port(), 9898);
        assert!(config.bind_addr.ip().is_loopback());
    }

    #[test]
    fn test_with_port() {
        assert_eq!(MetricsServerConfig::with_port(8080).bind_addr.port(), 8080);
    }

    #[test]
    fn test_health_line_reports_frames() {
        let registry = MetricsRegistry::new().unwrap();
        let server = MetricsServer::new(MetricsServerConfig::default(), registry.clone());
        registry.update(&MetricsSnapshot {
            frames_processed: 9,
            ..Default::default()
        });

        assert_eq!(health_line(&server.registry), "ok frames=9");
    }
}

//! HTTP boundary: thin JSON adapters over the store, analytics and webhooks.

pub mod auth;
pub mod error;
pub mod routes;
pub mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::Config;
use crate::core::errors::{AgdError, Result};
use crate::store::StoreHandle;
use auth::{PASSWORD_HEADER, PasswordDigest};

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub store: StoreHandle,
    pub password: Option<PasswordDigest>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state from a validated config. The store opens on first request.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.webhooks.timeout_ms))
            .build()
            .map_err(|error| AgdError::Runtime {
                details: format!("http client: {error}"),
            })?;
        Ok(Self {
            store: StoreHandle::new(&config.paths.sqlite_db),
            password: config
                .server
                .dashboard_password
                .as_deref()
                .map(PasswordDigest::of),
            http,
            config,
        })
    }
}

/// Full application router with trace and CORS layers.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origin);
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::auth_routes())
        .merge(routes::analytics_routes())
        .merge(routes::catalog_routes(routes::Catalog::Equipment))
        .merge(routes::catalog_routes(routes::Catalog::Antennas))
        .merge(routes::form_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => AllowOrigin::exact(value),
            Err(error) => {
                tracing::warn!(origin, %error, "unusable CORS origin, allowing none");
                AllowOrigin::list(std::iter::empty::<HeaderValue>())
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(PASSWORD_HEADER)])
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr =
        state
            .config
            .server
            .bind_addr
            .parse()
            .map_err(|error| AgdError::InvalidConfig {
                details: format!("server.bind_addr: {error}"),
            })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AgdError::io(addr.to_string(), source))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| AgdError::io(addr.to_string(), source))?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

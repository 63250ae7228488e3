//! Route groups. Store access runs on the blocking pool; every dashboard
//! route checks the shared password first.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::AppState;
use super::auth;
use super::error::ApiError;
use super::webhook;
use crate::analytics::{AnalyticsOptions, AnalyticsResult, aggregate_documents};
use crate::core::errors::{AgdError, Result};
use crate::dashboard::{antenna_view, equipment_view};
use crate::records::{LogEntry, normalize_document};
use crate::store::{DocumentStore, StoredDocument};

type AppStateArc = Arc<AppState>;
type ApiResult<T> = std::result::Result<T, ApiError>;

/// Default page size for list routes.
const DEFAULT_LIST_LIMIT: u32 = 50;

async fn with_store<T, F>(state: &AppStateArc, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&DocumentStore) -> Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.store.with(f))
        .await
        .map_err(|error| AgdError::Runtime {
            details: format!("store task: {error}"),
        })?
        .map_err(ApiError::from)
}

fn require_dashboard(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    auth::check(state.password.as_ref(), headers).map_err(ApiError::from)
}

fn clamp_limit(requested: Option<u32>, max: u32) -> u32 {
    requested.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, max.max(1))
}

// ──────────────────── health & auth ────────────────────

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/api/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

pub fn auth_routes() -> Router<AppStateArc> {
    Router::new().route("/api/auth/login", post(login))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AppStateArc>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    match &state.password {
        Some(expected) if !expected.matches(&req.password) => {
            tracing::info!("dashboard login rejected");
            Err(ApiError(AgdError::Unauthorized))
        }
        _ => Ok(Json(json!({ "ok": true }))),
    }
}

// ──────────────────── analytics & logs ────────────────────

pub fn analytics_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/analytics", get(analytics))
        .route("/api/logs", get(logs))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyticsQuery {
    trend_days: Option<i64>,
    manual_flow_minutes: Option<f64>,
}

async fn analytics(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsResult>> {
    require_dashboard(&state, &headers)?;
    let cfg = &state.config.analytics;

    let mut options = AnalyticsOptions::from_config(cfg);
    if let Some(days) = query.trend_days {
        let clamped = days.clamp(1, i64::from(cfg.max_trend_days));
        options = options.with_trend_days(u32::try_from(clamped).unwrap_or(cfg.trend_days));
    }
    if let Some(minutes) = query.manual_flow_minutes {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(ApiError::bad_request(
                "manualFlowMinutes must be a finite value >= 0",
            ));
        }
        options = options.with_manual_flow_minutes(minutes);
    }

    let collection = state.config.store.logs_collection.clone();
    let limit = cfg.fetch_limit;
    let docs = with_store(&state, move |store| store.list_recent(&collection, limit)).await?;
    let bodies: Vec<Value> = docs.into_iter().map(|doc| doc.body).collect();
    Ok(Json(aggregate_documents(
        &bodies,
        Utc::now(),
        &Local,
        &options,
    )))
}

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct LogRow {
    id: String,
    #[serde(flatten)]
    entry: LogEntry,
}

async fn logs(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<LogRow>>> {
    require_dashboard(&state, &headers)?;
    let collection = state.config.store.logs_collection.clone();
    let limit = clamp_limit(query.limit, state.config.analytics.fetch_limit);
    let docs = with_store(&state, move |store| store.list_recent(&collection, limit)).await?;
    let rows = docs
        .into_iter()
        .filter_map(|doc| {
            normalize_document(&doc.body).map(|entry| LogRow { id: doc.id, entry })
        })
        .collect();
    Ok(Json(rows))
}

// ──────────────────── catalog CRUD ────────────────────

/// The two catalog collections exposed for CRUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Equipment,
    Antennas,
}

impl Catalog {
    const fn base_path(self) -> &'static str {
        match self {
            Self::Equipment => "/api/equipment",
            Self::Antennas => "/api/antennas",
        }
    }

    fn collection(self, state: &AppState) -> String {
        match self {
            Self::Equipment => state.config.store.equipment_collection.clone(),
            Self::Antennas => state.config.store.antennas_collection.clone(),
        }
    }

    fn view(self, doc: &StoredDocument) -> Value {
        let mapped = match self {
            Self::Equipment => {
                equipment_view(&doc.id, &doc.body).and_then(|v| serde_json::to_value(v).ok())
            }
            Self::Antennas => {
                antenna_view(&doc.id, &doc.body).and_then(|v| serde_json::to_value(v).ok())
            }
        };
        mapped.unwrap_or(Value::Null)
    }
}

pub fn catalog_routes(catalog: Catalog) -> Router<AppStateArc> {
    let base = catalog.base_path();
    Router::new()
        .route(
            base,
            get(
                move |State(state): State<AppStateArc>,
                      headers: HeaderMap,
                      Query(query): Query<LimitQuery>| async move {
                    list_catalog(catalog, state, headers, query).await
                },
            )
            .post(
                move |State(state): State<AppStateArc>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| async move {
                    create_catalog(catalog, state, headers, body).await
                },
            ),
        )
        .route(
            &format!("{base}/:id"),
            get(
                move |State(state): State<AppStateArc>,
                      headers: HeaderMap,
                      Path(id): Path<String>| async move {
                    show_catalog(catalog, state, headers, id).await
                },
            )
            .put(
                move |State(state): State<AppStateArc>,
                      headers: HeaderMap,
                      Path(id): Path<String>,
                      Json(body): Json<Value>| async move {
                    replace_catalog(catalog, state, headers, id, body).await
                },
            )
            .delete(
                move |State(state): State<AppStateArc>,
                      headers: HeaderMap,
                      Path(id): Path<String>| async move {
                    delete_catalog(catalog, state, headers, id).await
                },
            ),
        )
}

async fn list_catalog(
    catalog: Catalog,
    state: AppStateArc,
    headers: HeaderMap,
    query: LimitQuery,
) -> ApiResult<Json<Vec<Value>>> {
    require_dashboard(&state, &headers)?;
    let collection = catalog.collection(&state);
    let limit = clamp_limit(query.limit, state.config.analytics.fetch_limit);
    let docs = with_store(&state, move |store| store.list_recent(&collection, limit)).await?;
    Ok(Json(docs.iter().map(|doc| catalog.view(doc)).collect()))
}

async fn show_catalog(
    catalog: Catalog,
    state: AppStateArc,
    headers: HeaderMap,
    id: String,
) -> ApiResult<Json<Value>> {
    require_dashboard(&state, &headers)?;
    let collection = catalog.collection(&state);
    let doc = with_store(&state, move |store| {
        store
            .get(&collection, &id)?
            .ok_or_else(|| AgdError::not_found(&collection, &id))
    })
    .await?;
    Ok(Json(catalog.view(&doc)))
}

async fn create_catalog(
    catalog: Catalog,
    state: AppStateArc,
    headers: HeaderMap,
    body: Value,
) -> ApiResult<Response> {
    require_dashboard(&state, &headers)?;
    let collection = catalog.collection(&state);
    let doc = with_store(&state, move |store| store.insert(&collection, &body)).await?;
    Ok((StatusCode::CREATED, Json(catalog.view(&doc))).into_response())
}

async fn replace_catalog(
    catalog: Catalog,
    state: AppStateArc,
    headers: HeaderMap,
    id: String,
    body: Value,
) -> ApiResult<Json<Value>> {
    require_dashboard(&state, &headers)?;
    let collection = catalog.collection(&state);
    let doc = with_store(&state, move |store| store.replace(&collection, &id, &body)).await?;
    Ok(Json(catalog.view(&doc)))
}

async fn delete_catalog(
    catalog: Catalog,
    state: AppStateArc,
    headers: HeaderMap,
    id: String,
) -> ApiResult<StatusCode> {
    require_dashboard(&state, &headers)?;
    let collection = catalog.collection(&state);
    with_store(&state, move |store| store.delete(&collection, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ──────────────────── forms ────────────────────

pub fn form_routes() -> Router<AppStateArc> {
    Router::new().route("/api/forms/:form", post(submit_form))
}

async fn submit_form(
    State(state): State<AppStateArc>,
    Path(form): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Response> {
    let Some(url) = state.config.webhooks.endpoint(&form) else {
        return Err(ApiError(AgdError::not_found("webhooks", &form)));
    };
    let timeout = Duration::from_millis(state.config.webhooks.timeout_ms);
    let relayed = webhook::forward(&state.http, &form, url, &payload, timeout).await?;
    Ok((relayed.status, Json(relayed.body)).into_response())
}

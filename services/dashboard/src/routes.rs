use crate::infra::{deserialize_date, parse_date, AppState};
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use sdr_funnel::error::AppError;
use sdr_funnel::workflows::funnel::{rollup, Report, Rollup};
use sdr_funnel::workflows::publish::{render_dashboard, ReportIndex, ReportStore};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct RollupQuery {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) from: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) to: NaiveDate,
}

pub(crate) fn dashboard_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/reports", get(report_index))
        .route("/api/v1/reports/:date", get(report_by_date))
        .route("/api/v1/rollup", get(rollup_endpoint))
        .route("/dashboard/:date", get(dashboard_page))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn report_index(
    Extension(state): Extension<AppState>,
) -> Result<Json<ReportIndex>, AppError> {
    let index = read_store(&state, |store| Ok(store.index()?)).await?;
    Ok(Json(index))
}

pub(crate) async fn report_by_date(
    Extension(state): Extension<AppState>,
    Path(raw_date): Path<String>,
) -> Result<Json<Report>, AppError> {
    let date = parse_date(&raw_date).map_err(AppError::InvalidRequest)?;
    let report = read_store(&state, move |store| Ok(store.load(date)?)).await?;
    Ok(Json(report))
}

pub(crate) async fn rollup_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<RollupQuery>,
) -> Result<Json<Rollup>, AppError> {
    let RollupQuery { from, to } = query;
    if from > to {
        return Err(AppError::InvalidRequest(format!(
            "from {from} is after to {to}"
        )));
    }

    let reports = read_store(&state, move |store| Ok(store.load_range(from, to)?)).await?;
    rollup(&reports)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("stored reports between {from} and {to}")))
}

pub(crate) async fn dashboard_page(
    Extension(state): Extension<AppState>,
    Path(raw_date): Path<String>,
) -> Result<Html<String>, AppError> {
    let date = parse_date(&raw_date).map_err(AppError::InvalidRequest)?;
    let page = read_store(&state, move |store| {
        let report = store.load(date)?;
        Ok(render_dashboard(&report)?)
    })
    .await?;
    Ok(Html(page))
}

/// Runs filesystem reads against the report store off the async workers.
async fn read_store<T, F>(state: &AppState, read: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&ReportStore) -> Result<T, AppError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || read(&store))
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?
}

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use perp_screener_screener::ScreenerService;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub exists: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub row_count: usize,
}

/// Returns the latest snapshot as CSV text.
///
/// # Errors
/// Returns `StatusCode::NOT_FOUND` if no run has completed yet.
pub async fn get_data(
    State(service): State<Arc<ScreenerService>>,
) -> Result<Response, StatusCode> {
    let snapshot = service
        .store()
        .latest()
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok((
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        snapshot.csv_text,
    )
        .into_response())
}

/// Reports snapshot freshness.
pub async fn get_status(State(service): State<Arc<ScreenerService>>) -> Json<StatusResponse> {
    let snapshot = service.store().latest().await;
    let response = match snapshot {
        Some(snapshot) => StatusResponse {
            exists: true,
            updated_at: Some(snapshot.updated_at),
            row_count: snapshot.row_count,
        },
        None => StatusResponse {
            exists: false,
            updated_at: None,
            row_count: 0,
        },
    };
    Json(response)
}

/// Starts a background refresh.
///
/// Returns 202 Accepted when a run was started, 409 Conflict when one is
/// already in progress.
pub async fn trigger_refresh(State(service): State<Arc<ScreenerService>>) -> StatusCode {
    if service.try_trigger() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::CONFLICT
    }
}

use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

use crate::api::models::HealthResponse;

pub fn success<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn health() -> (StatusCode, Json<HealthResponse>) {
    success(HealthResponse {
        ok: true,
        ts: Utc::now().timestamp_millis(),
    })
}

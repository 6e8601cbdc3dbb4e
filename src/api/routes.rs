use axum::{
    routing::{get, post},
    Router,
    extract::{rejection::JsonRejection, Json, State},
    response::IntoResponse,
};
use std::time::Instant;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;

use crate::error::{AppError, Result};
use crate::api::models::ScrapeRequest;
use crate::api::response;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/scrape", post(scrape_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn health_handler() -> impl IntoResponse {
    response::health()
}

async fn scrape_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(reason = %rejection.body_text(), "rejected scrape body");
        AppError::Validation(rejection.body_text())
    })?;
    let request = body.validate()?;

    let url = request.url.clone();
    tracing::info!(%url, mode = request.mode.as_str(), "processing scrape request");
    let start_time = Instant::now();

    // Dropping the in-flight strategy on timeout still tears down its browser.
    let outcome = tokio::time::timeout(state.config.request_timeout, state.scraper.handle(&request)).await;
    let elapsed_ms = start_time.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(result)) => {
            tracing::info!(
                %url,
                mode_used = result.mode_used.as_str(),
                char_count = result.char_count,
                elapsed_ms,
                "scrape succeeded"
            );
            Ok(response::success(result))
        }
        Ok(Err(err)) => {
            tracing::error!(%url, error_kind = err.kind(), error = %err, elapsed_ms, "scrape failed");
            Err(err.into())
        }
        Err(_) => {
            tracing::error!(%url, elapsed_ms, "scrape request timed out");
            Err(AppError::RequestTimeout(state.config.request_timeout))
        }
    }
}

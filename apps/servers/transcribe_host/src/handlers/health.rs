use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use tracing::instrument;

#[derive(Serialize)]
pub struct HealthResponse {
	ok: bool,
}

#[axum::debug_handler]
#[instrument(name = "health")]
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
	(StatusCode::OK, Json(HealthResponse { ok: true }))
}

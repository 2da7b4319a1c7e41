use axum::{http::StatusCode, response::IntoResponse};

/// Liveness check; never touches the firmware store
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, [("Content-Type", "text/plain")], "ok")
}

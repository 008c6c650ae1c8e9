pub mod parcels;
pub mod payments;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "parcel-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, "parcel-service is running")
}

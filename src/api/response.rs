use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

use crate::api::models::LivenessResponse;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

pub fn success<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn error(status: StatusCode, detail: String) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { detail }))
}

pub fn liveness() -> (StatusCode, Json<LivenessResponse>) {
    success(LivenessResponse {
        message: "Analysis gateway is running!".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

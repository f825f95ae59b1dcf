//! Route handlers. JSON bodies use the `{success, data, error}` envelope.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::error;

use pulsarwatch_core::ClusterStatus;
use pulsarwatch_state::HealthSnapshot;

use crate::ApiState;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub scope: String,
    #[serde(flatten)]
    pub health: HealthSnapshot,
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, [("content-type", TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "metrics exposition failed");
            error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}

/// GET /healthz
pub async fn healthz(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.health.snapshot();
    let code = if snapshot.status == ClusterStatus::TotalDown {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, ApiResponse::ok(snapshot))
}

/// GET /status
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(StatusReport {
        scope: state.scope.clone(),
        health: state.health.snapshot(),
    })
}

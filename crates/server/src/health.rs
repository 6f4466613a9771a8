//! `/health`, `/health/ready`, `/health/live`: the proxy's liveness/readiness and
//! credential-backed health surface.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use llm::AppState;
use serde::Serialize;

#[derive(Serialize)]
struct HealthChecks {
    api_server: bool,
    credentials: bool,
    model_configuration: bool,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    checks: HealthChecks,
}

pub fn router(state: Arc<AppState>, path: &str) -> Router {
    Router::new()
        .route(path, get(health))
        .route("/health/ready", get(ready))
        .route("/health/live", get(live))
        .with_state(state)
}

/// Degraded (503) when the active provider's credentials are missing or expired;
/// healthy (200) otherwise.
async fn health(State(state): State<Arc<AppState>>) -> Response {
    let provider = state.factory().get(state.active_mode()).await;

    let (credentials_ok, model_configuration_ok) = match &provider {
        Ok(provider) => {
            let status = provider.auth_status().await;
            (status.has_credentials && !status.is_expired, true)
        }
        Err(_) => (false, false),
    };

    let body = HealthBody {
        status: if credentials_ok { "healthy" } else { "degraded" },
        checks: HealthChecks {
            api_server: true,
            credentials: credentials_ok,
            model_configuration: model_configuration_ok,
        },
    };

    let status_code = if credentials_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(body)).into_response()
}

async fn ready() -> StatusCode {
    StatusCode::OK
}

async fn live() -> StatusCode {
    StatusCode::OK
}

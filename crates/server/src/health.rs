use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub credentials: HealthCheck,
    pub install: HealthCheck,
    pub checked_at: String,
}

/// Readiness report. Missing client credentials mark the service degraded
/// (it still answers URL verification, but cannot verify or install);
/// the install state is informational since "configured but awaiting
/// install" is a normal resting point.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ready = state.missing_credentials.is_empty();
    let credentials = if ready {
        HealthCheck { status: "ready", detail: "client credentials configured".to_string() }
    } else {
        HealthCheck {
            status: "degraded",
            detail: format!("missing: {}", state.missing_credentials.join(", ")),
        }
    };

    let install = if state.store.is_installed() {
        HealthCheck { status: "installed", detail: "bot token present".to_string() }
    } else {
        HealthCheck {
            status: "uninstalled",
            detail: "no bot token; complete the install flow".to_string(),
        }
    };

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        credentials,
        install,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

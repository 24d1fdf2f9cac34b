//! HTTP surface exposed to Slack and to browsers.
//!
//! HTML Endpoints:
//! - `GET  /install`      — install page with the "Add to Slack" link
//! - `GET  /thanks`       — OAuth redirect target; completes the install
//!
//! Slack Endpoints:
//! - `POST /slack`        — event callbacks and URL verification
//! - `POST /after_button` — interactive button actions (form `payload`)
//!
//! Operational:
//! - `GET  /health`       — readiness report (see `health`)

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tera::{Context, Tera};
use tracing::{info, warn};
use wavebot_core::credentials::CredentialStore;
use wavebot_slack::events::{EventRouter, RouterReply};
use wavebot_slack::oauth::Installer;

use crate::health;

/// Header that tells Slack not to redeliver a payload we have already
/// classified as un-handleable.
pub const NO_RETRY_HEADER: HeaderName = HeaderName::from_static("x-slack-no-retry");

#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<Tera>,
    pub store: Arc<CredentialStore>,
    pub events: Arc<EventRouter>,
    pub installer: Arc<Installer>,
    pub missing_credentials: Vec<&'static str>,
}

/// Initialize the Tera engine with the page templates.
fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/**/*.html") {
        Ok(tera) => tera,
        Err(error) => {
            warn!(error = %error, "failed to load templates from filesystem, using embedded copies");
            Tera::default()
        }
    };

    // Embedded copies keep the binary self-contained when no templates
    // directory ships alongside it.
    tera.add_raw_template("install.html", include_str!("../../../templates/install.html")).ok();
    tera.add_raw_template("thanks.html", include_str!("../../../templates/thanks.html")).ok();

    Arc::new(tera)
}

pub fn router(
    store: Arc<CredentialStore>,
    events: Arc<EventRouter>,
    installer: Arc<Installer>,
    missing_credentials: Vec<&'static str>,
) -> Router {
    let state = AppState {
        templates: init_templates(),
        store,
        events,
        installer,
        missing_credentials,
    };

    Router::new()
        .route("/install", get(install_page))
        .route("/thanks", get(thanks_page))
        .route("/slack", post(slack_events))
        .route("/after_button", post(interactive_actions))
        .route("/health", get(health::health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// HTML handlers
// ---------------------------------------------------------------------------

async fn install_page(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let snapshot = state.store.snapshot();
    let mut context = Context::new();
    context.insert("client_id", &snapshot.client_id);

    render(&state.templates, "install.html", &context)
}

#[derive(Debug, Deserialize, Default)]
struct ThanksQuery {
    code: Option<String>,
}

/// OAuth redirect target. A failed exchange still renders the page in its
/// degraded variant; the install flow must never take the process down.
async fn thanks_page(
    State(state): State<AppState>,
    Query(query): Query<ThanksQuery>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let mut context = Context::new();

    match query.code {
        Some(code) => match state.installer.complete_install(&code).await {
            Ok(installed) => {
                info!(
                    event_name = "system.install.completed",
                    bot_user_id = installed.bot_user_id.as_deref().unwrap_or("unknown"),
                    "oauth install completed"
                );
                context.insert("installed", &true);
            }
            Err(error) => {
                warn!(
                    event_name = "system.install.failed",
                    error = %error,
                    "oauth install failed; rendering degraded thanks page"
                );
                context.insert("installed", &false);
                context.insert("reason", &error.to_string());
            }
        },
        None => {
            context.insert("installed", &false);
            context.insert("reason", "the redirect carried no authorization code");
        }
    }

    render(&state.templates, "thanks.html", &context)
}

fn render(
    templates: &Tera,
    name: &str,
    context: &Context,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    templates.render(name, context).map(Html).map_err(|error| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("<h1>Template error</h1><p>{error}</p>")),
        )
    })
}

// ---------------------------------------------------------------------------
// Slack handlers
// ---------------------------------------------------------------------------

async fn slack_events(State(state): State<AppState>, body: String) -> Response {
    reply_to_response(state.events.handle_event_body(&body).await)
}

async fn interactive_actions(State(state): State<AppState>, body: String) -> Response {
    reply_to_response(state.events.handle_action_body(&body).await)
}

fn reply_to_response(reply: RouterReply) -> Response {
    match reply {
        RouterReply::Challenge(challenge) => {
            ([(header::CONTENT_TYPE, "application/json")], challenge).into_response()
        }
        RouterReply::Ack => StatusCode::OK.into_response(),
        RouterReply::AckNoRetry(body) => {
            (StatusCode::OK, [(NO_RETRY_HEADER, "1")], body).into_response()
        }
        RouterReply::ActionBody(body) => {
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        RouterReply::Forbidden => StatusCode::FORBIDDEN.into_response(),
        RouterReply::NotFound(body) => {
            (StatusCode::NOT_FOUND, [(NO_RETRY_HEADER, "1")], body).into_response()
        }
    }
}

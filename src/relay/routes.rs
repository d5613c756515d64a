//! HTTP surface: the send endpoint, health check, CORS and request tracing.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handler::MailRelay;
use super::model::SendRequest;
use crate::error::SendError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: MailRelay,
    pub max_body_bytes: usize,
}

/// Build the Axum router for the relay.
///
/// `max_body_bytes` caps the JSON body, base64 attachment included.
pub fn relay_routes(relay: MailRelay, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            "/send-email",
            post(send_email).fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            relay,
            max_body_bytes,
        })
}

/// Open CORS policy: any origin, any header.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mail-relay"
    }))
}

// ── Send ────────────────────────────────────────────────────────────────

async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(request)) => state.relay.handle(request).await,
        Err(rejection) => Err(classify_rejection(&rejection, state.max_body_bytes)),
    };

    match result {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => {
            if e.is_client_error() {
                warn!(error = %e, "Rejected send request");
            }
            e.into_response()
        }
    }
}

/// Keep the extractor's own status class (413, 415) instead of a blanket 400.
fn classify_rejection(rejection: &JsonRejection, limit: usize) -> SendError {
    let status = rejection.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        SendError::PayloadTooLarge { limit }
    } else if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
        SendError::UnsupportedMediaType(rejection.body_text())
    } else {
        SendError::MalformedBody(rejection.body_text())
    }
}

async fn method_not_allowed(method: Method) -> impl IntoResponse {
    warn!(%method, "Method not allowed on /send-email");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(serde_json::json!({"error": "Only POST allowed"})),
    )
}

impl IntoResponse for SendError {
    fn into_response(self) -> Response {
        let status = match &self {
            SendError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            SendError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };

        match self {
            // Transport detail stays in the server log.
            SendError::Transport(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Failed to send email"
                })),
            )
                .into_response(),
            client => (
                status,
                Json(serde_json::json!({"error": client.to_string()})),
            )
                .into_response(),
        }
    }
}

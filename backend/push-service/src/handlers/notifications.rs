//! HTTP surface for notification injection and connection status
//!
//! Other services (order processing, admin actions) post payloads here;
//! the body is pushed verbatim to the addressee's open channels.

use actix_web::{error::JsonPayloadError, web, HttpResponse};
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::websocket::{DeliveryOutcome, UserId};

/// Request body size limit (256 KB)
const PAYLOAD_SIZE_LIMIT: usize = 256_000;

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub user_id: UserId,
    pub connected: bool,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

/// Push a payload to one user
///
/// Endpoint: POST /api/v1/notify/{user_id}
pub async fn notify_user(
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse> {
    let user_id = UserId::parse(&path.into_inner())?;
    let outcome = state.dispatcher.notify_with_outcome(&user_id, &body.into_inner());

    Ok(HttpResponse::Accepted().json(NotifyResponse {
        connected: !outcome.is_offline(),
        user_id,
        outcome,
    }))
}

/// Push a payload to every connected user
///
/// Endpoint: POST /api/v1/broadcast
pub async fn broadcast(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse> {
    let outcome = state.dispatcher.broadcast(&body.into_inner());
    Ok(HttpResponse::Accepted().json(outcome))
}

/// Get WebSocket connection status for a user
///
/// Endpoint: GET /api/v1/ws/status/{user_id}
pub async fn ws_status(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = UserId::parse(&path.into_inner())?;
    let channels = state.registry.channels_for(&user_id);
    let connected_since = channels.iter().map(|channel| channel.opened_at()).min();

    Ok(HttpResponse::Ok().json(json!({
        "user_id": user_id,
        "connected": !channels.is_empty(),
        "connection_count": channels.len(),
        "connected_since": connected_since
    })))
}

/// Get connection metrics
///
/// Endpoint: GET /api/v1/ws/metrics
pub async fn ws_metrics(state: web::Data<AppState>) -> HttpResponse {
    let total_connections = state.registry.total_connections();
    let connected_users = state.registry.connected_users_count();

    HttpResponse::Ok().json(json!({
        "total_connections": total_connections,
        "connected_users": connected_users,
        "average_connections_per_user": if connected_users > 0 {
            total_connections as f64 / connected_users as f64
        } else {
            0.0
        }
    }))
}

/// Get list of all connected user IDs
///
/// Endpoint: GET /api/v1/ws/users
pub async fn list_connected_users(state: web::Data<AppState>) -> HttpResponse {
    let user_ids = state.registry.connected_user_ids();

    HttpResponse::Ok().json(json!({
        "count": user_ids.len(),
        "users": user_ids
    }))
}

/// Malformed JSON is reported as an invalid payload; size and content-type
/// problems as a plain bad request
fn payload_error(err: JsonPayloadError) -> AppError {
    match err {
        JsonPayloadError::Deserialize(e) => AppError::Serialization(e),
        other => AppError::BadRequest(other.to_string()),
    }
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(
                web::JsonConfig::default()
                    .limit(PAYLOAD_SIZE_LIMIT)
                    .error_handler(|err, _req| payload_error(err).into()),
            )
            .route("/notify/{user_id}", web::post().to(notify_user))
            .route("/broadcast", web::post().to(broadcast))
            .route("/ws/status/{user_id}", web::get().to(ws_status))
            .route("/ws/metrics", web::get().to(ws_metrics))
            .route("/ws/users", web::get().to(list_connected_users)),
    );
}

//! WebSocket upgrade endpoint
//!
//! Endpoint: GET /ws?userId=<id>
//!
//! The addressee is taken from the `userId` query parameter (`user_id` is
//! accepted too), falling back to the `X-User-Id` header. Connections
//! without one are rejected before anything is registered.

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::websocket::{Channel, PushSession, Registration, UserId};

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: Option<String>,
}

/// Resolve the owning user of a new connection from its metadata
pub fn extract_user_id(params: &ConnectParams, req: &HttpRequest) -> Result<UserId> {
    let from_query = params
        .user_id
        .as_deref()
        .filter(|value| !value.trim().is_empty());

    let raw = from_query
        .or_else(|| {
            req.headers()
                .get(USER_ID_HEADER)
                .and_then(|value| value.to_str().ok())
        })
        .ok_or_else(|| {
            AppError::InvalidUserId("missing userId query parameter or X-User-Id header".to_string())
        })?;

    UserId::parse(raw)
}

pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<ConnectParams>,
    state: web::Data<AppState>,
) -> std::result::Result<HttpResponse, Error> {
    let user_id = match extract_user_id(&query, &req) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!(
                peer = ?req.peer_addr(),
                "WebSocket connection rejected: {}",
                e
            );
            return Err(e.into());
        }
    };

    // Registered before the upgrade completes, so any dispatch after the
    // client sees the 101 response already reaches this channel
    let (channel, frames) = Channel::open();
    let channel_id = channel.id();
    let registration = Registration::new(state.registry.clone(), user_id.clone(), channel);

    let session = PushSession::new(
        registration,
        frames,
        state.config.heartbeat_interval(),
        state.config.client_timeout(),
    );

    // On handshake failure the session is dropped and its registration with it
    match ws::WsResponseBuilder::new(session, &req, stream)
        .frame_size(state.config.max_frame_size)
        .start()
    {
        Ok(resp) => {
            tracing::debug!(user_id = %user_id, channel_id = %channel_id, "WebSocket upgrade accepted");
            Ok(resp)
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "WebSocket handshake failed");
            Err(e)
        }
    }
}

/// Register WebSocket routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_connect));
}

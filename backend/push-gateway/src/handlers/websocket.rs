/// WebSocket endpoints
///
/// `GET /ws` upgrades and hands the connection to the admission handshake.
/// The `/api/v1/ws` scope exposes connection status and the in-process dispatcher to
/// co-located producers.
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::Identity;
use crate::state::AppState;
use crate::websocket::{handshake, Event};

/// Upgrade endpoint
///
/// Endpoint: GET /ws
pub async fn ws_handler(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !handshake::is_websocket_upgrade(&req) {
        return Err(AppError::UpgradeRequired);
    }

    let authorization = handshake::authorization_header(&req);
    let (response, session, inbound) = actix_ws::handle(&req, body)?;

    actix_web::rt::spawn(handshake::admit(
        state.registry.clone(),
        state.verifier.clone(),
        authorization,
        session,
        inbound,
    ));

    Ok(response)
}

/// Get WebSocket connection status for a user
///
/// Endpoint: GET /api/v1/ws/status/{user_id}
pub async fn ws_status(path: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let identity = Identity::from(path.into_inner());
    let connected = state.registry.is_connected(&identity).await;

    Ok(HttpResponse::Ok().json(json!({
        "user_id": identity,
        "connected": connected,
    })))
}

/// Get connection stats
///
/// Endpoint: GET /api/v1/ws/stats
pub async fn ws_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "connected_users": state.registry.len().await,
    })))
}

/// Send an event to one user
///
/// Endpoint: POST /api/v1/ws/notify/{user_id}
///
/// Accepted whether or not the user is online.
pub async fn send_user_event(
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: web::Json<Event>,
) -> Result<HttpResponse> {
    let identity = Identity::from(path.into_inner());
    state.dispatcher.dispatch_to_user(identity, body.into_inner());

    Ok(HttpResponse::Accepted().json(json!({ "accepted": true })))
}

/// Broadcast an event to all connected users
///
/// Endpoint: POST /api/v1/ws/broadcast
pub async fn broadcast_event(
    state: web::Data<AppState>,
    body: web::Json<Event>,
) -> Result<HttpResponse> {
    state.dispatcher.dispatch_broadcast(body.into_inner());

    Ok(HttpResponse::Accepted().json(json!({ "accepted": true })))
}

/// JSON body rules for event payloads
///
/// Undecodable bodies are answered with the crate's `{"error": ...}` shape.
pub fn event_json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Register WebSocket routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_handler)).service(
        web::scope("/api/v1/ws")
            .app_data(event_json_config())
            .route("/status/{user_id}", web::get().to(ws_status))
            .route("/stats", web::get().to(ws_stats))
            .route("/notify/{user_id}", web::post().to(send_user_event))
            .route("/broadcast", web::post().to(broadcast_event)),
    );
}

// GET /ws and GET /health handlers

use std::convert::Infallible;

use tracing::debug;
use warp::ws::Ws;

use crate::realtime::run_session;
use crate::service::ChatService;

// GET /ws
pub fn socket_handler(ws: Ws, service: ChatService) -> impl warp::Reply {
    // Subscribe before the upgrade so events published right after the
    // handshake reach this client
    let events = service.hub().subscribe();
    let scope = service.hub().scope();
    debug!(subscribers = service.hub().subscriber_count(), "websocket upgrade requested");
    ws.on_upgrade(move |socket| run_session(socket, events, scope))
}

// GET /health
pub async fn health_handler() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&serde_json::json!({ "status": "ok" })))
}

/// HTTP handlers for the push gateway
pub mod websocket;

use actix_web::web;

use crate::metrics;

pub use websocket::register_routes as register_websocket;

async fn health() -> &'static str {
    "OK"
}

/// Register every route the gateway serves
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics::serve_metrics))
        .configure(register_websocket);
}

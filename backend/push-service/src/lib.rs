pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod state;
pub mod websocket;

use actix_web::web;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
pub use websocket::{Channel, ChannelId, ChannelRegistry, DeliveryOutcome, Dispatcher, UserId};

/// Mount every route the service exposes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(|| async { "OK" }))
        .route("/metrics", web::get().to(metrics::serve_metrics))
        .configure(handlers::register_websocket)
        .configure(handlers::register_notifications);
}

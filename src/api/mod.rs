// ============================================================================
// HTTP API
// ============================================================================
//
// POST /orders      (also /api/order)   place an order
// GET  /orders/{id}                     read an accepted order
// GET  /health                          breaker-driven health report
//
// ============================================================================

mod error;
mod handlers;

use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, web, App, HttpRequest, HttpServer};
use std::sync::Arc;

use crate::settings::ServerConfig;
use crate::placement::OrderPlacementCoordinator;

pub use error::{ApiError, ErrorBody};

pub struct AppState {
    pub(crate) coordinator: Arc<OrderPlacementCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<OrderPlacementCoordinator>) -> Self {
        Self { coordinator }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/orders", web::post().to(handlers::place_order))
        .route("/api/order", web::post().to(handlers::place_order))
        .route("/orders/{id}", web::get().to(handlers::get_order))
        .route("/health", web::get().to(handlers::health));
}

fn json_error(error: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %error, "Rejecting unreadable order payload");
    ApiError::BadRequest(error.to_string()).into()
}

pub fn start_api_server(state: web::Data<AppState>, config: &ServerConfig) -> std::io::Result<Server> {
    tracing::info!("🚀 Starting order API on http://{}:{}", config.host, config.port);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure)
    });

    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    Ok(server.bind((config.host.as_str(), config.port))?.run())
}

//! # API Module
//!
//! HTTP surface used when the server runs with `--http`.
//!
//! ## Available Endpoints
//! - `GET /api/health` - Liveness plus the signing account address
//! - `POST /api/rpc` - JSON-RPC, same dispatcher as the stdio transport

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod health;
pub mod rpc;

pub fn create_router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(health::health_handler))
        .route("/rpc", post(rpc::rpc_handler));

    Router::new()
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

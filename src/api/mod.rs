use crate::state::DashboardContext;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;

pub mod handlers;
pub mod responses;

pub fn router(context: Arc<DashboardContext>) -> Router {
    Router::new()
        .route("/", get(handlers::get_index))
        .route("/get_data", get(handlers::get_data))
        .route("/api/latency", get(handlers::get_latency_summary))
        .route("/api/health", get(handlers::get_health))
        .with_state(context)
}

//! Rockets API — HTTP surface of the rockets message processor.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the application router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::messages::router())
        .merge(routes::rockets::router())
        .with_state(state)
}

//! Ingestion endpoint for rocket lifecycle messages.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::post};
use rockets_messaging::Acknowledgement;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /messages
///
/// The body is read as raw bytes so that a redelivery of identical bytes
/// resolves to the identical event identity.
#[instrument(skip(state, body), fields(body_len = body.len()))]
async fn receive_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let ack = Acknowledgement::new();
    let event_id = state.processor.process(&body, &ack).await?;
    debug!(event_id = %event_id, settlement = ?ack.settlement(), "message settled");
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for message ingestion.
pub fn router() -> Router<AppState> {
    Router::new().route("/messages", post(receive_message))
}

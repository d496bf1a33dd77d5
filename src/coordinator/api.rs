//! HTTP handlers for the coordinator
//!
//! ```text
//! POST /reg  {clock, ip, dev}                 -> "<id>"
//! POST /mov  {id, start?, end?, rot?, mov}    -> "thanks!"
//! ```
//!
//! Any other method on these paths answers `501 Not Implemented`.
//! Malformed bodies are rejected per request with `400`.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::Result;

use super::clock;
use super::command::{MoveRequest, MovementCommand, MovementKind};
use super::registry::RegisterRequest;
use super::server::AppState;

/// Body returned once a movement has been queued
pub const MOVE_ACK: &str = "thanks!";

// ============================================================================
// Decoding
// ============================================================================

/// A request body that could not be turned into a registration or movement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Body is not valid JSON of the expected shape
    #[error("Malformed request body: {0}")]
    Json(String),

    /// A field decoded but holds an unusable value
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Decode a JSON request body
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> std::result::Result<T, DecodeError> {
    serde_json::from_slice(body).map_err(|e| DecodeError::Json(e.to_string()))
}

impl TryFrom<MoveRequest> for MovementCommand {
    type Error = DecodeError;

    fn try_from(request: MoveRequest) -> std::result::Result<Self, Self::Error> {
        let target_id = u64::try_from(request.id).map_err(|_| DecodeError::InvalidField {
            field: "id",
            reason: format!("{} is negative", request.id),
        })?;

        let kind = MovementKind::from_code(&request.mov).ok_or_else(|| DecodeError::InvalidField {
            field: "mov",
            reason: format!("unknown movement code '{}'", request.mov),
        })?;

        Ok(Self {
            target_id,
            kind,
            start_ms: request.start,
            end_ms: request.end,
            rotation_degrees: request.rot.unwrap_or(0.0),
        })
    }
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/reg", post(register_device).fallback(not_implemented))
        .route("/mov", post(submit_movement).fallback(not_implemented))
        .with_state(state)
}

/// Register a device and answer with its logical ID
async fn register_device(State(state): State<AppState>, body: Bytes) -> Result<String> {
    // Arrival time is taken before decoding so parsing does not skew the offset
    let now = clock::now_ms();

    let request: RegisterRequest = decode_body(&body)?;
    tracing::info!(ip = %request.ip, dev = %request.dev, clock = request.clock, "Registration request");

    let id = state.registry.register_request(&request, now).await?;
    Ok(id.to_string())
}

/// Queue a movement directive
///
/// Waits while the queue is full; the response does not wait for the relay.
async fn submit_movement(State(state): State<AppState>, body: Bytes) -> Result<&'static str> {
    let request: MoveRequest = decode_body(&body)?;
    let command = MovementCommand::try_from(request)?;

    tracing::info!(
        target_id = command.target_id,
        kind = %command.kind,
        rotation_degrees = command.rotation_degrees,
        "Movement request"
    );

    state.queue.enqueue(command).await?;
    Ok(MOVE_ACK)
}

async fn not_implemented() -> impl IntoResponse {
    (StatusCode::NOT_IMPLEMENTED, "Not Implemented")
}

// ============================================================================
// Tests
// ============================================================================

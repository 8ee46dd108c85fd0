use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::types::{ErrorBody, GenerateRequest, HealthResponse};
use super::ServerState;
use crate::error::ResponderError;
use crate::responder::GeneratedResponse;

/// Failure of a request, rendered as `{"detail": ...}`.
///
/// Provider details never reach the client; they are logged instead.
pub struct ApiError(ResponderError);

impl From<ResponderError> for ApiError {
    fn from(e: ResponderError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            ResponderError::Provider(_) => (StatusCode::BAD_GATEWAY, "chat completion failed"),
            ResponderError::Synthesis { .. } => {
                (StatusCode::BAD_GATEWAY, "speech synthesis failed")
            }
            ResponderError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };
        log::error!("Request failed with {}: {}", status, self.0);
        (
            status,
            Json(ErrorBody {
                detail: detail.to_string(),
            }),
        )
            .into_response()
    }
}

/// Handles `POST /generate-response/`
///
/// # Returns
/// * `Ok(Json<GeneratedResponse>)` - reply text and its audio as a latin-1 string
/// * `Err(ApiError)` - 502 when a downstream call fails, 500 otherwise
///
/// Malformed bodies are rejected by the `Json` extractor before reaching here.
pub async fn handle_generate_response(
    State(state): State<ServerState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GeneratedResponse>, ApiError> {
    let response = state.responder.generate_response(&req.transcript).await?;
    Ok(Json(response))
}

pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

use serde::{Deserialize, Serialize};

/// Request payload for the response generation endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct GenerateRequest {
    /// What the user said
    pub transcript: String,
}

/// Error payload returned for failed requests
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Liveness payload
#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

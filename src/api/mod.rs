//! HTTP surface of the voice responder.
//!
//! Exposes a single generation endpoint plus a liveness probe. Cross-origin
//! requests are accepted from any origin, credentials included.

mod handlers;
mod types;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::error::ResponderError;
use crate::responder::Responder;
use handlers::{handle_generate_response, handle_health};

pub use handlers::ApiError;
pub use types::{ErrorBody, GenerateRequest, HealthResponse};

/// Main server struct wrapping the shared responder
pub struct Server {
    responder: Responder,
}

/// Internal server state shared between request handlers
#[derive(Clone)]
struct ServerState {
    responder: Responder,
}

impl Server {
    /// Creates a new server around a configured responder
    pub fn new(responder: Responder) -> Self {
        Self { responder }
    }

    /// Builds the router with all routes and the CORS layer.
    pub fn router(&self) -> Router {
        // Mirroring instead of `Any` since credentials forbid wildcard headers.
        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true);

        Router::new()
            .route("/generate-response/", post(handle_generate_response))
            .route("/generate-response", post(handle_generate_response))
            .route("/health", get(handle_health))
            .layer(cors)
            .with_state(ServerState {
                responder: self.responder.clone(),
            })
    }

    /// Serves requests on an already bound listener until ctrl-c.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ResponderError> {
        if let Ok(addr) = listener.local_addr() {
            log::info!("Listening on http://{}", addr);
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ResponderError::configuration(format!("Server error: {}", e)))
    }

    /// Starts the server and listens for requests on the specified address
    ///
    /// # Arguments
    /// * `addr` - Address to bind to (e.g. "127.0.0.1:8000")
    pub async fn run(self, addr: &str) -> Result<(), ResponderError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            ResponderError::configuration(format!("Cannot bind {}: {}", addr, e))
        })?;
        self.serve(listener).await
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutting down"),
        Err(e) => {
            log::warn!("Cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await
        }
    }
}

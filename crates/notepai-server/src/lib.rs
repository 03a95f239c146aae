//! HTTP surface for the writing assistant.
//!
//! Each endpoint takes and returns JSON. Autocomplete never fails: any error
//! is logged and answered with an empty completion so the editor simply
//! shows nothing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use notepai_ai::api::{
    AutocompleteRequest, AutocompleteResponse, ComposerRequest, ComposerResponse, ErrorBody,
    QuickEditRequest, QuickEditResponse,
};
use notepai_ai::{AiError, Backend};

type SharedBackend = Arc<dyn Backend>;

/// Build the router serving the three endpoints.
pub fn build_router(backend: SharedBackend) -> Router {
    Router::new()
        .route("/autocomplete", post(autocomplete))
        .route("/quickedit", post(quick_edit))
        .route("/composer", post(composer))
        .with_state(backend)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(addr: SocketAddr, backend: SharedBackend) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, build_router(backend)).await?;
    Ok(())
}

/// An error answered as `{"error": ...}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Validation failures keep their message; anything else becomes a
    /// generic 500 with `fallback`.
    fn from_ai(err: AiError, fallback: &str) -> Self {
        match err {
            AiError::InvalidRequest(message) => {
                warn!(%message, "rejected request");
                Self {
                    status: StatusCode::BAD_REQUEST,
                    message,
                }
            }
            other => {
                error!(error = %other, "{fallback}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: fallback.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn autocomplete(
    State(backend): State<SharedBackend>,
    Json(req): Json<AutocompleteRequest>,
) -> Json<AutocompleteResponse> {
    match backend.autocomplete(req).await {
        Ok(resp) => Json(resp),
        Err(e) => {
            error!(error = %e, "autocomplete failed");
            Json(AutocompleteResponse::default())
        }
    }
}

async fn quick_edit(
    State(backend): State<SharedBackend>,
    Json(req): Json<QuickEditRequest>,
) -> Result<Json<QuickEditResponse>, ApiError> {
    backend
        .quick_edit(req)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_ai(e, "Failed to process quick edit"))
}

async fn composer(
    State(backend): State<SharedBackend>,
    Json(req): Json<ComposerRequest>,
) -> Result<Json<ComposerResponse>, ApiError> {
    backend
        .compose(req)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_ai(e, "Failed to process request"))
}

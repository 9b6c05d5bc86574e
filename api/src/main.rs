use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use application::{ApplicationError, DocumentService};
use domain::{Document, SearchRequest};
use infrastructure::InMemoryDocumentRepository;

/// Application state shared by the handlers
#[derive(Clone)]
struct AppState {
    document_service: Arc<DocumentService>,
}

const DEFAULT_PORT: u16 = 3000;

// Application entry point
#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    let port = port_from_env();

    // --- Dependency Injection ---
    let document_repository = Arc::new(InMemoryDocumentRepository::new());
    let document_service = Arc::new(DocumentService::new(document_repository));
    let app_state = AppState { document_service };
    info!("Document store initialized.");

    let app = router(app_state);

    // --- Server Startup ---
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Reads `PORT`, falling back to the default when it is unset or invalid.
fn port_from_env() -> u16 {
    match env::var("PORT") {
        Ok(port_str) => match u16::from_str(&port_str) {
            Ok(port_num) => {
                info!("Using port {} from environment variable PORT.", port_num);
                port_num
            }
            Err(_) => {
                warn!(
                    "Invalid PORT value '{}' in environment variable. Using default port {}.",
                    port_str, DEFAULT_PORT
                );
                DEFAULT_PORT
            }
        },
        Err(_) => {
            info!(
                "PORT environment variable not set. Using default port {}.",
                DEFAULT_PORT
            );
            DEFAULT_PORT
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats_handler))
        .route("/documents", post(save_document_handler))
        .route("/documents/search", post(search_documents_handler))
        .route("/documents/:id", get(get_document_handler))
        .with_state(state)
}

// --- API Handlers ---

async fn health_check() -> impl IntoResponse {
    info!("Health check endpoint called");
    (StatusCode::OK, "OK")
}

async fn get_stats_handler(State(state): State<AppState>) -> Response {
    match state.document_service.stats().await {
        Ok(stats) => (StatusCode::OK, JsonResponse(stats)).into_response(),
        Err(e) => {
            error!("Failed to get statistics via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for upserting a document (POST /documents). The id is optional.
async fn save_document_handler(
    State(state): State<AppState>,
    Json(payload): Json<Document>,
) -> Response {
    info!(doc_id = %payload.id_label(), "Received request to save document");
    match state.document_service.save(payload).await {
        Ok(document) => (StatusCode::OK, JsonResponse(document)).into_response(),
        Err(e) => {
            error!("Failed to save document via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for fetching a document (GET /documents/:id).
async fn get_document_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.document_service.get_document(&id).await {
        Ok(document) => (StatusCode::OK, JsonResponse(document)).into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Handler for searching documents (POST /documents/search).
async fn search_documents_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Response {
    info!(unfiltered = request.is_unfiltered(), "Received search request");
    match state.document_service.search(request).await {
        Ok(response) => {
            info!("Search completed via handler, {} total hits", response.nb_hits);
            (StatusCode::OK, JsonResponse(response)).into_response()
        }
        Err(e) => {
            error!("Failed to search documents via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Maps ApplicationError to an HTTP status code and JSON error body.
fn map_application_error_to_response(err: ApplicationError) -> Response {
    let (status, message) = match err {
        ApplicationError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        ApplicationError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("Document '{}' not found", id),
        ),
    };
    (status, JsonResponse(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_errors_map_to_status_codes() {
        let response = map_application_error_to_response(ApplicationError::NotFound("x".to_string()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            map_application_error_to_response(ApplicationError::InvalidInput("bad".to_string()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

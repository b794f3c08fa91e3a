//! HTTP endpoint layer.
//!
//! Exposes the chat API over axum, maps service errors to HTTP responses,
//! and records every call with its request and response payloads. The
//! "health" endpoint reflects process liveness only; it performs no upstream
//! connectivity check.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Settings;
use crate::service::{ChatError, ChatService};
use crate::types::{ChatRequest, ChatResponse, ErrorResponse, Role};

pub struct AppState {
    pub settings: Settings,
    pub service: ChatService,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let chat_routes = Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health));

    let prefix = format!("{}/chat", state.settings.api_prefix);

    Router::new()
        .route("/", get(root))
        .nest(&prefix, chat_routes)
        .layer(middleware::from_fn(process_time))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.settings.cors_origins))
        .with_state(state)
}

/// Start the HTTP server (blocks until shutdown).
pub async fn run_server(
    settings: Settings,
    service: ChatService,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState { settings, service });
    let app = router(state.clone());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("{} listening on {}", state.settings.project_name, addr);
    info!(
        "  provider: {} (model {})",
        state.settings.provider.as_str(),
        state.service.provider().model()
    );
    info!(
        "  endpoints: POST {p}/chat/chat, GET {p}/chat/health, GET /",
        p = state.settings.api_prefix
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Stamp every response with the processing duration in seconds.
async fn process_time(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;

    let elapsed = start.elapsed().as_secs_f64();
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:.6}")) {
        response.headers_mut().insert("x-process-time", value);
    }
    response
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origin_values(origins)))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn origin_values(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect()
}

// ==================== Handlers ====================

async fn root(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": format!(
            "Welcome to {}. POST {}/chat/chat to talk to the assistant.",
            state.settings.project_name, state.settings.api_prefix
        ),
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ai-chat-api",
        "provider": state.settings.provider.as_str(),
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.message.trim().is_empty() {
        let err = ChatError::EmptyMessage;
        log_error("/chat", &err, &request);
        return Err(error_response(&state.settings, &err));
    }

    match state
        .service
        .respond(&request.message, &request.previous_messages)
        .await
    {
        Ok(reply) => {
            let response = ChatResponse {
                content: reply.content,
                // A caller continuing a conversation keeps its own id
                conversation_id: request
                    .conversation_id
                    .clone()
                    .unwrap_or(reply.conversation_id),
                timestamp: Utc::now(),
                model_used: reply.model_used,
                role: Role::Assistant,
            };
            log_call("/chat", &request, &response);
            Ok(Json(response))
        }
        Err(err) => {
            log_error("/chat", &err, &request);
            Err(error_response(&state.settings, &err))
        }
    }
}

// ==================== Error Mapping ====================

fn error_response(settings: &Settings, error: &ChatError) -> (StatusCode, Json<ErrorResponse>) {
    match error {
        ChatError::EmptyMessage => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid request".to_string(),
                detail: Some("Message cannot be empty".to_string()),
            }),
        ),
        ChatError::Generation(_) | ChatError::Join(_) => {
            let detail = if settings.debug {
                Some(format!("{error:?}"))
            } else {
                Some("An unexpected error occurred".to_string())
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to process chat request".to_string(),
                    detail,
                }),
            )
        }
    }
}

// ==================== Logging ====================

fn log_call(route: &str, request: &ChatRequest, response: &ChatResponse) {
    info!(
        "api call {} request={} response={}",
        route,
        serde_json::to_string(request).unwrap_or_default(),
        serde_json::to_string(response).unwrap_or_default()
    );
}

fn log_error(route: &str, error: &ChatError, request: &ChatRequest) {
    error!(
        "error in {}: {:?} request={}",
        route,
        error,
        serde_json::to_string(request).unwrap_or_default()
    );
}

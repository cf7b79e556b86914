//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the health and chat history endpoints and the
//! master definition for the OpenAPI specification.

use crate::web::analyze::{AnalyzeIdeaRequest, AnalyzeIdeaResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use idea_namer_core::domain::MessageRole;
use idea_namer_core::ports::PortError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        crate::web::analyze::analyze_idea_handler,
        get_chat_handler,
        delete_chat_handler,
    ),
    components(
        schemas(AnalyzeIdeaRequest, AnalyzeIdeaResponse, ChatResponse, ChatMessageResponse)
    ),
    tags(
        (name = "Idea Namer API", description = "Startup naming agent with domain availability checks.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ChatMessageResponse {
    id: Uuid,
    #[schema(value_type = String)]
    role: MessageRole,
    /// The stored JSON document, as text.
    content: String,
    created_at: DateTime<Utc>,
}

/// A chat with its live messages in creation order.
#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    id: Uuid,
    user_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    messages: Vec<ChatMessageResponse>,
}

/// Maps a port failure onto a status code and a plain-text message.
pub fn port_error_response(e: PortError, context: &str) -> (StatusCode, String) {
    let status = match e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, format!("{}: {}", context, e))
}

fn parse_chat_id(raw: &str) -> Result<Uuid, (StatusCode, String)> {
    Uuid::parse_str(raw).map_err(|_| (StatusCode::NOT_FOUND, "Chat not found".to_string()))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Fetch a chat and its messages.
#[utoipa::path(
    get,
    path = "/chats/{chat_id}",
    responses(
        (status = 200, description = "The chat and its messages", body = ChatResponse),
        (status = 404, description = "Chat not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("chat_id" = String, Path, description = "The chat identifier.")
    )
)]
pub async fn get_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let chat_id = parse_chat_id(&chat_id)?;
    let db = &app_state.db;

    let result = async {
        let chat = db.get_chat_by_id(chat_id).await?;
        let messages = db.get_messages_for_chat(chat_id).await?;
        Ok::<_, PortError>((chat, messages))
    }
    .await;

    match result {
        Ok((chat, messages)) => Ok(Json(ChatResponse {
            id: chat.id,
            user_id: chat.user_id,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            messages: messages
                .into_iter()
                .map(|m| ChatMessageResponse {
                    id: m.id,
                    role: m.role,
                    content: m.content,
                    created_at: m.created_at,
                })
                .collect(),
        })),
        Err(PortError::NotFound(_)) => Err((StatusCode::NOT_FOUND, "Chat not found".to_string())),
        Err(e) => {
            error!("Failed to load chat {}: {:?}", chat_id, e);
            Err(port_error_response(e, "Failed to load chat"))
        }
    }
}

/// Soft-delete a chat and its messages.
#[utoipa::path(
    delete,
    path = "/chats/{chat_id}",
    responses(
        (status = 204, description = "Chat deleted"),
        (status = 404, description = "Chat not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("chat_id" = String, Path, description = "The chat identifier.")
    )
)]
pub async fn delete_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let chat_id = parse_chat_id(&chat_id)?;

    match app_state.db.soft_delete_chat(chat_id).await {
        Ok(()) => {
            info!("Soft-deleted chat {}", chat_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(PortError::NotFound(_)) => Err((StatusCode::NOT_FOUND, "Chat not found".to_string())),
        Err(e) => {
            error!("Failed to delete chat {}: {:?}", chat_id, e);
            Err(port_error_response(e, "Failed to delete chat"))
        }
    }
}

//! services/api/src/web/analyze.rs
//!
//! The `POST /analyze-idea` handler: stores the idea, runs the naming agent with
//! the domain checker attached, stores the reply and returns it.

const PROMPT: &str = r#"
You are a helpful assistant that analyzes startup ideas and checks if the domain is available.

### Goal

You will be given a startup idea and you will need to generate

- Generate 10 names for the startup
- Check if the domain is available for each name, loop until you find 10 available domain
- A little story behind the domain name

### Domain names

- Consider wide range of domain names, not just .com, .net, .org, etc.
- 50% of the domain names should be .com, .net, .org, etc.
- other can be experimental like .ai, .app, .fast, .work.. any available TLDs

### Tools

Use the check_domain_availability tool with a list of candidate domains. Call it as many
times as you need. When you have all the available domains, return the JSON result only
and nothing else.

### Input validation

If the input is not a valid startup idea or idea is not clear, you MUST say
{
	"error": "The input is not a valid startup idea or idea is not clear",
	"message": "Message to display to the user"
}

### Output

You MUST return the JSON result only with the following fields:

{
	"names": [
		{
			"name": "example.com",
			"domain": "example.com",
			"story": "A little story behind the domain name"
		},
		...
	]
}

NOW ANALYSE THIS:
"#;

const DEFAULT_OWNER: &str = "anonymous";

/// Header carrying the owner recorded on newly created chats.
pub const USER_ID_HEADER: &str = "x-user-id";

use crate::web::rest::port_error_response;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use idea_namer_core::domain::{Message, MessageRole};
use idea_namer_core::ports::PortError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

/// A startup idea to name, optionally continuing an earlier chat.
#[derive(Deserialize, ToSchema)]
pub struct AnalyzeIdeaRequest {
    pub idea: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// The chat the exchange was stored under and the agent's answer.
#[derive(Serialize, ToSchema)]
pub struct AnalyzeIdeaResponse {
    pub chat_id: String,
    /// Parsed JSON when the agent answered with JSON, otherwise the raw text.
    pub result: serde_json::Value,
}

//=========================================================================================
// Output Helpers
//=========================================================================================

/// Removes markdown code-fence markers the model wraps around its JSON.
pub fn strip_code_fences(output: &str) -> String {
    output.replace("```json", "").replace("```", "")
}

/// Parses the cleaned output as JSON, falling back to the text itself.
pub fn parse_result(cleaned: &str) -> serde_json::Value {
    serde_json::from_str(cleaned).unwrap_or_else(|_| serde_json::Value::String(cleaned.to_string()))
}

pub fn build_agent_input(idea: &str) -> String {
    format!("{}\n\nStartup Idea: {}", PROMPT, idea)
}

//=========================================================================================
// Handler
//=========================================================================================

/// Analyze a startup idea and suggest names with available domains.
#[utoipa::path(
    post,
    path = "/analyze-idea",
    request_body = AnalyzeIdeaRequest,
    responses(
        (status = 200, description = "Names generated", body = AnalyzeIdeaResponse),
        (status = 400, description = "Malformed request body"),
        (status = 404, description = "Chat not found"),
        (status = 500, description = "Storage or agent failure")
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "Owner recorded on newly created chats.")
    )
)]
pub async fn analyze_idea_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Decode the request body.
    let request: AnalyzeIdeaRequest = serde_json::from_slice(&body)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let db = &app_state.db;

    // 2. Resolve or create the chat.
    let chat = match request.chat_id.as_deref().filter(|id| !id.is_empty()) {
        Some(raw_id) => {
            let not_found = || (StatusCode::NOT_FOUND, "Chat not found".to_string());
            let chat_id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;
            db.get_chat_by_id(chat_id).await.map_err(|e| match e {
                PortError::NotFound(_) => not_found(),
                other => {
                    error!("Failed to load chat {}: {:?}", chat_id, other);
                    port_error_response(other, "Failed to load chat")
                }
            })?
        }
        None => {
            let owner = headers
                .get(USER_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_OWNER);
            db.create_chat(owner).await.map_err(|e| {
                error!("Failed to create chat: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to create chat: {}", e),
                )
            })?
        }
    };

    // 3. Store the user's turn before the agent runs.
    let user_content = json!({ "type": "user_input", "idea": request.idea }).to_string();
    db.save_message(Message::new(chat.id, MessageRole::User, user_content))
        .await
        .map_err(|e| {
            error!("Failed to store user message for chat {}: {:?}", chat.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to store user message: {}", e),
            )
        })?;

    // 4. Run the agent with the tools attached.
    info!("Running naming agent for chat {}", chat.id);
    let run = app_state
        .agent
        .run(&build_agent_input(&request.idea), &app_state.tools)
        .await
        .map_err(|e| {
            error!("Agent run failed for chat {}: {:?}", chat.id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    // 5. Clean the output.
    let cleaned = strip_code_fences(&run.output);

    // 6. Store the assistant's turn; the caller still gets the answer if this fails.
    let assistant_content = json!({
        "type": "assistant_response",
        "result": cleaned,
        "steps": run.steps,
    })
    .to_string();
    if let Err(e) = db
        .save_message(Message::new(chat.id, MessageRole::Assistant, assistant_content))
        .await
    {
        warn!("Failed to store assistant message for chat {}: {}", chat.id, e);
    }

    // 7 & 8. Shape the response.
    Ok(Json(AnalyzeIdeaResponse {
        chat_id: chat.id.to_string(),
        result: parse_result(&cleaned),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        let output = "```json\n{\"names\": []}\n```";
        assert_eq!(strip_code_fences(output), "\n{\"names\": []}\n");
    }

    #[test]
    fn fenced_json_parses_to_structure() {
        let value = parse_result(&strip_code_fences("```json\n{\"names\":[{\"name\":\"Leafloot\"}]}\n```"));
        assert_eq!(value["names"][0]["name"], "Leafloot");
    }

    #[test]
    fn plain_text_falls_back_to_string() {
        let value = parse_result("I could not find any names.");
        assert_eq!(value, serde_json::Value::String("I could not find any names.".to_string()));
    }

    #[test]
    fn agent_input_ends_with_the_idea() {
        let input = build_agent_input("A subscription box for rare houseplants");
        assert!(input.starts_with(PROMPT));
        assert!(input.ends_with("\n\nStartup Idea: A subscription box for rare houseplants"));
    }
}

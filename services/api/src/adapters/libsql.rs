//! services/api/src/adapters/libsql.rs
//!
//! A `DatabaseService` implementation for a remote libSQL (Turso) database.
//! Statements are sent over HTTPS to the `/v2/pipeline` endpoint, authenticated
//! with a bearer token.

use async_trait::async_trait;
use chrono::Utc;
use idea_namer_core::domain::{Chat, Message};
use idea_namer_core::ports::{DatabaseService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{format_timestamp, parse_role, parse_timestamp, parse_uuid};

const SCHEMA_SQL: &str =
    include_str!("../../migrations/20250101000000_create_chats_and_messages.sql");

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct PipelineRequest<'a> {
    requests: Vec<StreamRequest<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamRequest<'a> {
    Execute { stmt: Stmt<'a> },
    Close,
}

#[derive(Serialize)]
struct Stmt<'a> {
    sql: &'a str,
    args: Vec<HranaValue>,
}

/// A typed SQL value as encoded by the pipeline protocol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HranaValue {
    Null,
    Integer { value: String },
    Float { value: f64 },
    Text { value: String },
    Blob { base64: String },
}

impl HranaValue {
    fn text(value: impl Into<String>) -> Self {
        HranaValue::Text { value: value.into() }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            HranaValue::Text { value } => Some(value),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct PipelineResponse {
    results: Vec<StreamResult>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: StreamError },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamResponse {
    Execute { result: StmtResult },
    Close,
}

#[derive(Deserialize)]
struct StreamError {
    message: String,
}

#[derive(Deserialize, Default)]
struct StmtResult {
    #[serde(default)]
    rows: Vec<Vec<HranaValue>>,
    #[serde(default)]
    affected_row_count: u64,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter talking to a remote libSQL server over HTTP.
#[derive(Clone)]
pub struct LibsqlAdapter {
    client: reqwest::Client,
    pipeline_url: String,
    auth_token: Option<String>,
}

impl LibsqlAdapter {
    /// Creates a new `LibsqlAdapter` for an `https://` (or `http://`) database URL.
    pub fn new(url: &str, auth_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            pipeline_url: format!("{}/v2/pipeline", url.trim_end_matches('/')),
            auth_token,
        }
    }

    /// Applies the schema. Every statement is `IF NOT EXISTS`, so this is idempotent.
    pub async fn run_migrations(&self) -> PortResult<()> {
        let statements: Vec<(&str, Vec<HranaValue>)> = SCHEMA_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| (s, Vec::new()))
            .collect();
        self.execute_batch(statements).await?;
        info!("Remote database schema is up to date.");
        Ok(())
    }

    async fn execute(&self, sql: &str, args: Vec<HranaValue>) -> PortResult<StmtResult> {
        self.execute_batch(vec![(sql, args)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PortError::Unexpected("Pipeline returned no result".to_string()))
    }

    /// Runs the statements in order on one stream and returns their results.
    async fn execute_batch(
        &self,
        statements: Vec<(&str, Vec<HranaValue>)>,
    ) -> PortResult<Vec<StmtResult>> {
        let expected = statements.len();
        let mut requests: Vec<StreamRequest> = statements
            .into_iter()
            .map(|(sql, args)| StreamRequest::Execute { stmt: Stmt { sql, args } })
            .collect();
        requests.push(StreamRequest::Close);

        let mut request = self
            .client
            .post(&self.pipeline_url)
            .json(&PipelineRequest { requests });
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Remote database returned {}: {}",
                status, body
            )));
        }

        let pipeline: PipelineResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut results = Vec::with_capacity(expected);
        for result in pipeline.results {
            match result {
                StreamResult::Ok { response: StreamResponse::Execute { result } } => {
                    results.push(result)
                }
                StreamResult::Ok { response: StreamResponse::Close } => {}
                StreamResult::Error { error } => {
                    return Err(PortError::Unexpected(error.message));
                }
            }
        }
        if results.len() != expected {
            return Err(PortError::Unexpected(format!(
                "Expected {} statement results, got {}",
                expected,
                results.len()
            )));
        }
        debug!("Executed {} statement(s) on remote database", expected);
        Ok(results)
    }
}

//=========================================================================================
// Row Mapping
//=========================================================================================

fn column<'a>(row: &'a [HranaValue], index: usize) -> PortResult<&'a str> {
    row.get(index)
        .and_then(HranaValue::as_text)
        .ok_or_else(|| PortError::Unexpected(format!("Missing text column {}", index)))
}

fn optional_column(row: &[HranaValue], index: usize) -> Option<&str> {
    row.get(index).and_then(HranaValue::as_text)
}

fn chat_from_row(row: &[HranaValue]) -> PortResult<Chat> {
    Ok(Chat {
        id: parse_uuid(column(row, 0)?)?,
        user_id: column(row, 1)?.to_string(),
        created_at: parse_timestamp(column(row, 2)?)?,
        updated_at: parse_timestamp(column(row, 3)?)?,
        deleted_at: optional_column(row, 4).map(parse_timestamp).transpose()?,
    })
}

fn message_from_row(row: &[HranaValue]) -> PortResult<Message> {
    Ok(Message {
        id: parse_uuid(column(row, 0)?)?,
        chat_id: parse_uuid(column(row, 1)?)?,
        role: parse_role(column(row, 2)?)?,
        content: column(row, 3)?.to_string(),
        created_at: parse_timestamp(column(row, 4)?)?,
        updated_at: parse_timestamp(column(row, 5)?)?,
        deleted_at: optional_column(row, 6).map(parse_timestamp).transpose()?,
    })
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for LibsqlAdapter {
    async fn create_chat(&self, user_id: &str) -> PortResult<Chat> {
        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.execute(
            "INSERT INTO chats (id, user_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
            vec![
                HranaValue::text(chat.id.to_string()),
                HranaValue::text(chat.user_id.clone()),
                HranaValue::text(format_timestamp(chat.created_at)),
                HranaValue::text(format_timestamp(chat.updated_at)),
            ],
        )
        .await?;

        Ok(chat)
    }

    async fn get_chat_by_id(&self, chat_id: Uuid) -> PortResult<Chat> {
        let result = self
            .execute(
                "SELECT id, user_id, created_at, updated_at, deleted_at FROM chats WHERE id = ? AND deleted_at IS NULL",
                vec![HranaValue::text(chat_id.to_string())],
            )
            .await?;

        let row = result
            .rows
            .first()
            .ok_or_else(|| PortError::NotFound(format!("Chat {} not found", chat_id)))?;
        chat_from_row(row)
    }

    async fn soft_delete_chat(&self, chat_id: Uuid) -> PortResult<()> {
        let now = format_timestamp(Utc::now());
        let id = chat_id.to_string();
        let results = self
            .execute_batch(vec![
                (
                    "UPDATE chats SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
                    vec![
                        HranaValue::text(now.clone()),
                        HranaValue::text(now.clone()),
                        HranaValue::text(id.clone()),
                    ],
                ),
                (
                    "UPDATE messages SET deleted_at = ?, updated_at = ? WHERE chat_id = ? AND deleted_at IS NULL",
                    vec![
                        HranaValue::text(now.clone()),
                        HranaValue::text(now),
                        HranaValue::text(id),
                    ],
                ),
            ])
            .await?;

        match results.first() {
            Some(chat_update) if chat_update.affected_row_count > 0 => Ok(()),
            _ => Err(PortError::NotFound(format!("Chat {} not found", chat_id))),
        }
    }

    async fn save_message(&self, message: Message) -> PortResult<()> {
        self.execute_batch(vec![
            (
                "INSERT INTO messages (id, chat_id, role, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
                vec![
                    HranaValue::text(message.id.to_string()),
                    HranaValue::text(message.chat_id.to_string()),
                    HranaValue::text(message.role.as_str()),
                    HranaValue::text(message.content),
                    HranaValue::text(format_timestamp(message.created_at)),
                    HranaValue::text(format_timestamp(message.updated_at)),
                ],
            ),
            (
                "UPDATE chats SET updated_at = ? WHERE id = ?",
                vec![
                    HranaValue::text(format_timestamp(message.created_at)),
                    HranaValue::text(message.chat_id.to_string()),
                ],
            ),
        ])
        .await?;
        Ok(())
    }

    async fn get_messages_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<Message>> {
        let result = self
            .execute(
                "SELECT id, chat_id, role, content, created_at, updated_at, deleted_at FROM messages WHERE chat_id = ? AND deleted_at IS NULL ORDER BY created_at ASC, rowid ASC",
                vec![HranaValue::text(chat_id.to_string())],
            )
            .await?;

        result.rows.iter().map(|row| message_from_row(row)).collect()
    }

    async fn close(&self) {
        // Each pipeline request closes its own stream; nothing is held open.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok_execute(rows: serde_json::Value, affected: u64) -> serde_json::Value {
        json!({
            "type": "ok",
            "response": {
                "type": "execute",
                "result": {
                    "cols": [],
                    "rows": rows,
                    "affected_row_count": affected,
                    "last_insert_rowid": null
                }
            }
        })
    }

    fn ok_close() -> serde_json::Value {
        json!({"type": "ok", "response": {"type": "close"}})
    }

    #[tokio::test]
    async fn create_chat_posts_insert_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/pipeline"))
            .and(header("authorization", "Bearer db-token"))
            .and(body_partial_json(json!({
                "requests": [{"type": "execute"}, {"type": "close"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "baton": null,
                "base_url": null,
                "results": [ok_execute(json!([]), 1), ok_close()]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let db = LibsqlAdapter::new(&server.uri(), Some("db-token".to_string()));
        let chat = db.create_chat("user-1").await.unwrap();

        assert_eq!(chat.user_id, "user-1");
    }

    #[tokio::test]
    async fn get_chat_maps_row_columns() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        let row = json!([[
            {"type": "text", "value": id.to_string()},
            {"type": "text", "value": "user-1"},
            {"type": "text", "value": "2025-01-02T03:04:05.000000Z"},
            {"type": "text", "value": "2025-01-02T03:04:06.000000Z"},
            {"type": "null"}
        ]]);
        Mock::given(method("POST"))
            .and(path("/v2/pipeline"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [ok_execute(row, 0), ok_close()]
            })))
            .mount(&server)
            .await;

        let db = LibsqlAdapter::new(&server.uri(), None);
        let chat = db.get_chat_by_id(id).await.unwrap();

        assert_eq!(chat.id, id);
        assert_eq!(chat.user_id, "user-1");
        assert!(chat.deleted_at.is_none());
        assert!(chat.updated_at > chat.created_at);
    }

    #[tokio::test]
    async fn empty_row_set_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [ok_execute(json!([]), 0), ok_close()]
            })))
            .mount(&server)
            .await;

        let db = LibsqlAdapter::new(&server.uri(), None);

        assert!(matches!(
            db.get_chat_by_id(Uuid::new_v4()).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn soft_delete_of_unknown_chat_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/pipeline"))
            .and(body_partial_json(json!({
                "requests": [{"type": "execute"}, {"type": "execute"}, {"type": "close"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [ok_execute(json!([]), 0), ok_execute(json!([]), 0), ok_close()]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let db = LibsqlAdapter::new(&server.uri(), None);

        assert!(matches!(
            db.soft_delete_chat(Uuid::new_v4()).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn statement_error_fails_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"type": "error", "error": {"message": "FOREIGN KEY constraint failed", "code": "SQLITE_CONSTRAINT"}},
                    ok_execute(json!([]), 0),
                    ok_close()
                ]
            })))
            .mount(&server)
            .await;

        let db = LibsqlAdapter::new(&server.uri(), None);
        let err = db
            .save_message(Message::new(
                Uuid::new_v4(),
                idea_namer_core::domain::MessageRole::User,
                "{}".to_string(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Unexpected(msg) if msg.contains("FOREIGN KEY")));
    }

    #[tokio::test]
    async fn http_failure_is_unexpected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let db = LibsqlAdapter::new(&server.uri(), Some("wrong".to_string()));

        assert!(matches!(
            db.create_chat("user-1").await,
            Err(PortError::Unexpected(msg)) if msg.contains("401")
        ));
    }

    #[tokio::test]
    async fn migrations_send_every_schema_statement() {
        let server = MockServer::start().await;
        let statement_count = SCHEMA_SQL.split(';').filter(|s| !s.trim().is_empty()).count();
        let mut results: Vec<serde_json::Value> =
            (0..statement_count).map(|_| ok_execute(json!([]), 0)).collect();
        results.push(ok_close());
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
            .expect(1)
            .mount(&server)
            .await;

        let db = LibsqlAdapter::new(&server.uri(), None);

        db.run_migrations().await.unwrap();
    }
}

//! services/api/src/adapters/db.rs
//!
//! This module contains the local database adapter, the concrete implementation
//! of the `DatabaseService` port backed by a SQLite file. It handles all
//! interactions with the database using `sqlx`.

use async_trait::async_trait;
use chrono::Utc;
use idea_namer_core::domain::{Chat, Message};
use idea_namer_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use super::{format_timestamp, parse_role, parse_timestamp, parse_uuid};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port on SQLite.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the SQLite file at `path`.
    pub async fn connect_file(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        info!("Connected to local SQLite database at {}", path.display());
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ChatRecord {
    id: String,
    user_id: String,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}
impl ChatRecord {
    fn to_domain(self) -> PortResult<Chat> {
        Ok(Chat {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            deleted_at: self.deleted_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: String,
    chat_id: String,
    role: String,
    content: String,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
}
impl MessageRecord {
    fn to_domain(self) -> PortResult<Message> {
        Ok(Message {
            id: parse_uuid(&self.id)?,
            chat_id: parse_uuid(&self.chat_id)?,
            role: parse_role(&self.role)?,
            content: self.content,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            deleted_at: self.deleted_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_chat(&self, user_id: &str) -> PortResult<Chat> {
        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        sqlx::query("INSERT INTO chats (id, user_id, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(chat.id.to_string())
            .bind(&chat.user_id)
            .bind(format_timestamp(chat.created_at))
            .bind(format_timestamp(chat.updated_at))
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(chat)
    }

    async fn get_chat_by_id(&self, chat_id: Uuid) -> PortResult<Chat> {
        let record = sqlx::query_as::<_, ChatRecord>(
            "SELECT id, user_id, created_at, updated_at, deleted_at FROM chats WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(chat_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or_else(|| PortError::NotFound(format!("Chat {} not found", chat_id)))?;

        record.to_domain()
    }

    async fn soft_delete_chat(&self, chat_id: Uuid) -> PortResult<()> {
        let now = format_timestamp(Utc::now());
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE chats SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(chat_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Chat {} not found", chat_id)));
        }

        sqlx::query(
            "UPDATE messages SET deleted_at = ?, updated_at = ? WHERE chat_id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(chat_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn save_message(&self, message: Message) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, chat_id, role, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(message.chat_id.to_string())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(format_timestamp(message.created_at))
        .bind(format_timestamp(message.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(format_timestamp(message.created_at))
            .bind(message.chat_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn get_messages_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, chat_id, role, content, created_at, updated_at, deleted_at FROM messages WHERE chat_id = ? AND deleted_at IS NULL ORDER BY created_at ASC, rowid ASC",
        )
        .bind(chat_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

//! crates/idea_namer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database driver or HTTP framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted conversation thread grouping the messages of one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("unknown message role '{}'", other)),
        }
    }
}

/// A single turn in a chat. `content` holds a JSON document as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Builds a fresh, not yet persisted message for `chat_id`.
    pub fn new(chat_id: Uuid, role: MessageRole, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            chat_id,
            role,
            content,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Availability of one domain as reported by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStatus {
    pub domain: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub summary: String,
}

/// One tool invocation performed by the agent while reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    pub tool: String,
    pub input: String,
    pub observation: String,
}

/// The outcome of a finished agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRun {
    pub output: String,
    pub steps: Vec<AgentStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_role_round_trips_through_its_text_form() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System] {
            assert_eq!(role.as_str().parse::<MessageRole>().unwrap(), role);
        }
        assert!("robot".parse::<MessageRole>().is_err());
    }

    #[test]
    fn new_message_is_live_and_stamped() {
        let chat_id = Uuid::new_v4();
        let message = Message::new(chat_id, MessageRole::User, "{}".to_string());

        assert_eq!(message.chat_id, chat_id);
        assert_eq!(message.created_at, message.updated_at);
        assert!(message.deleted_at.is_none());
    }

    #[test]
    fn domain_status_tolerates_missing_fields() {
        let status: DomainStatus = serde_json::from_str(r#"{"domain":"acme.ai"}"#).unwrap();
        assert_eq!(status.domain, "acme.ai");
        assert!(status.zone.is_empty());
    }
}

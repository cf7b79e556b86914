//! crates/idea_namer_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{AgentRun, Chat, DomainStatus, Message};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Chat Management ---
    async fn create_chat(&self, user_id: &str) -> PortResult<Chat>;

    /// Loads a live (not soft-deleted) chat.
    async fn get_chat_by_id(&self, chat_id: Uuid) -> PortResult<Chat>;

    /// Marks the chat and all of its messages as deleted.
    async fn soft_delete_chat(&self, chat_id: Uuid) -> PortResult<()>;

    // --- Message Management ---
    async fn save_message(&self, message: Message) -> PortResult<()>;

    /// Live messages of a chat in creation order.
    async fn get_messages_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<Message>>;

    // --- Lifecycle ---
    async fn close(&self);
}

#[async_trait]
pub trait DomainLookupService: Send + Sync {
    /// Looks up the registration status of a single domain name.
    async fn check_domain(&self, domain: &str) -> PortResult<DomainStatus>;
}

/// A named capability the agent can call while reasoning.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object sent by function-calling models.
    fn parameters(&self) -> serde_json::Value;

    /// Runs the tool on the raw argument text and returns its observation.
    async fn call(&self, input: &str) -> PortResult<String>;
}

#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Runs the agent on `input` until it produces a final answer or gives up.
    async fn run(&self, input: &str, tools: &[Arc<dyn Tool>]) -> PortResult<AgentRun>;
}

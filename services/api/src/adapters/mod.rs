pub mod agent_llm;
pub mod db;
pub mod domainr;
pub mod libsql;

pub use agent_llm::OpenAiAgentExecutor;
pub use db::DbAdapter;
pub use domainr::DomainrAdapter;
pub use libsql::LibsqlAdapter;

use chrono::{DateTime, SecondsFormat, Utc};
use idea_namer_core::domain::MessageRole;
use idea_namer_core::ports::{PortError, PortResult};
use uuid::Uuid;

// Both stores keep ids and timestamps as TEXT; these keep the encoding identical.

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> PortResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| PortError::Unexpected(format!("Invalid stored timestamp '{}': {}", raw, e)))
}

pub(crate) fn parse_uuid(raw: &str) -> PortResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| PortError::Unexpected(format!("Invalid stored id '{}': {}", raw, e)))
}

pub(crate) fn parse_role(raw: &str) -> PortResult<MessageRole> {
    raw.parse::<MessageRole>().map_err(PortError::Unexpected)
}

pub mod domain;
pub mod ports;

pub use domain::{AgentRun, AgentStep, Chat, DomainStatus, Message, MessageRole};
pub use ports::{
    AgentExecutor, DatabaseService, DomainLookupService, PortError, PortResult, Tool,
};

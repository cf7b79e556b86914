//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use idea_namer_core::ports::{AgentExecutor, DatabaseService, Tool};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub agent: Arc<dyn AgentExecutor>,
    /// Tools exposed to the agent on every run.
    pub tools: Vec<Arc<dyn Tool>>,
}

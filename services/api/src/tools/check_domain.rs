//! services/api/src/tools/check_domain.rs
//!
//! The `check_domain_availability` tool handed to the agent. It fans one lookup
//! per candidate domain out onto its own task and fails as a whole on the first
//! failed lookup.

use async_trait::async_trait;
use idea_namer_core::domain::DomainStatus;
use idea_namer_core::ports::{DomainLookupService, PortError, PortResult, Tool};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

const DESCRIPTION: &str = r#"Check if domain names are available. Use this tool to pass a list of domain names and check if they are available.
Example:

Input: {"domains": ["acme.com", "example.com", "test.com", ...]}

Output: [
    {
        "domain": "acme.com",
        "zone": "com",
        "status": "available",
        "summary": "The domain is available"
    },
    {
        "domain": "example.com",
        "zone": "com",
        "status": "unavailable",
        "summary": "The domain is unavailable"
    }
]"#;

/// The agent may send either a bare list or the function-calling arguments object.
#[derive(Deserialize)]
#[serde(untagged)]
enum CheckDomainInput {
    List(Vec<String>),
    Object { domains: Vec<String> },
}

impl CheckDomainInput {
    fn into_domains(self) -> Vec<String> {
        match self {
            CheckDomainInput::List(domains) => domains,
            CheckDomainInput::Object { domains } => domains,
        }
    }
}

//=========================================================================================
// The Tool Struct
//=========================================================================================

#[derive(Clone)]
pub struct CheckDomainTool {
    lookup: Arc<dyn DomainLookupService>,
}

impl CheckDomainTool {
    pub fn new(lookup: Arc<dyn DomainLookupService>) -> Self {
        Self { lookup }
    }

    /// Looks up every domain concurrently. Results arrive in completion order.
    pub async fn check_all(&self, domains: Vec<String>) -> PortResult<Vec<DomainStatus>> {
        let mut set = JoinSet::new();
        for domain in domains {
            let lookup = self.lookup.clone();
            set.spawn(async move {
                let result = lookup.check_domain(&domain).await;
                (domain, result)
            });
        }

        let mut statuses = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            let (domain, result) = joined
                .map_err(|e| PortError::Unexpected(format!("Domain lookup task failed: {}", e)))?;
            match result {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    warn!(
                        "Lookup for {} failed, discarding {} finished result(s): {}",
                        domain,
                        statuses.len(),
                        e
                    );
                    set.abort_all();
                    return Err(e);
                }
            }
        }
        Ok(statuses)
    }
}

//=========================================================================================
// `Tool` Trait Implementation
//=========================================================================================

#[async_trait]
impl Tool for CheckDomainTool {
    fn name(&self) -> &str {
        "check_domain_availability"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "domains": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Fully qualified domain names to check, e.g. \"acme.com\"."
                }
            },
            "required": ["domains"]
        })
    }

    async fn call(&self, input: &str) -> PortResult<String> {
        let domains = serde_json::from_str::<CheckDomainInput>(input)
            .map_err(|e| PortError::InvalidInput(format!("expected a list of domains: {}", e)))?
            .into_domains();
        info!("Checking availability of {} domain(s): {:?}", domains.len(), domains);

        let statuses = self.check_all(domains).await?;
        serde_json::to_string(&statuses).map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

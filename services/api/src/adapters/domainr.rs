//! services/api/src/adapters/domainr.rs
//!
//! This module contains the adapter for the Domainr availability API, reached
//! through RapidAPI. It implements the `DomainLookupService` port.

use async_trait::async_trait;
use idea_namer_core::domain::DomainStatus;
use idea_namer_core::ports::{DomainLookupService, PortError, PortResult};
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Vec<DomainStatus>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DomainLookupService` using the Domainr `v2/status` endpoint.
#[derive(Clone)]
pub struct DomainrAdapter {
    client: reqwest::Client,
    base_url: String,
    api_host: String,
    api_key: String,
}

impl DomainrAdapter {
    /// Creates a new `DomainrAdapter`. The RapidAPI host header is derived from `base_url`.
    pub fn new(client: reqwest::Client, base_url: &str, api_key: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let api_host = base_url
            .split("://")
            .nth(1)
            .unwrap_or(&base_url)
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            client,
            base_url,
            api_host,
            api_key,
        }
    }
}

//=========================================================================================
// `DomainLookupService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DomainLookupService for DomainrAdapter {
    async fn check_domain(&self, domain: &str) -> PortResult<DomainStatus> {
        debug!("Checking availability of {}", domain);

        let response = self
            .client
            .get(format!("{}/v2/status", self.base_url))
            .query(&[("domain", domain)])
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "Domain lookup for {} returned {}",
                domain, status
            )));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        body.status
            .into_iter()
            .next()
            .ok_or_else(|| PortError::Unexpected(format!("no status found for {}", domain)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> DomainrAdapter {
        DomainrAdapter::new(reqwest::Client::new(), &server.uri(), "test-key".to_string())
    }

    #[test]
    fn host_header_is_derived_from_base_url() {
        let adapter = DomainrAdapter::new(
            reqwest::Client::new(),
            "https://domainr.p.rapidapi.com/",
            "k".to_string(),
        );
        assert_eq!(adapter.api_host, "domainr.p.rapidapi.com");
        assert_eq!(adapter.base_url, "https://domainr.p.rapidapi.com");
    }

    #[tokio::test]
    async fn returns_first_status_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/status"))
            .and(query_param("domain", "leafloot.com"))
            .and(header("x-rapidapi-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": [
                    {"domain": "leafloot.com", "zone": "com", "status": "undelegated inactive", "summary": "inactive"},
                    {"domain": "ignored.com", "zone": "com", "status": "active", "summary": "active"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let status = adapter(&server).check_domain("leafloot.com").await.unwrap();

        assert_eq!(status.domain, "leafloot.com");
        assert_eq!(status.zone, "com");
        assert_eq!(status.summary, "inactive");
    }

    #[tokio::test]
    async fn empty_status_list_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": []})))
            .mount(&server)
            .await;

        let err = adapter(&server).check_domain("nothing.io").await.unwrap_err();

        assert!(matches!(err, PortError::Unexpected(msg) if msg.contains("no status found")));
    }

    #[tokio::test]
    async fn unparseable_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        assert!(adapter(&server).check_domain("acme.com").await.is_err());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "forbidden"})))
            .mount(&server)
            .await;

        assert!(adapter(&server).check_domain("acme.com").await.is_err());
    }
}

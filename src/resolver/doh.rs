//! reqwest-backed DoH client using the JSON API (`application/dns-json`)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde::Deserialize;

use super::{DnsQueryResult, DnsResolver};
use crate::error::{DomainGridError, Result};
use crate::types::{CheckConfig, DohProvider, RecordType};

/// DNS-over-HTTPS client shared by every classification task
#[derive(Clone)]
pub struct DohClient {
    client: Client,
    request_timeout: Duration,
}

impl DohClient {
    /// Build a client sized for the configured concurrency
    pub fn new(config: &CheckConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/dns-json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .pool_max_idle_per_host(config.max_concurrency)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| DomainGridError::network(format!("Failed to create HTTP client: {}", e), None, None))?;

        Ok(Self {
            client,
            request_timeout: config.request_timeout,
        })
    }

    /// Map a transport failure, reporting the timeout actually in effect
    fn request_error(&self, err: reqwest::Error) -> DomainGridError {
        if err.is_timeout() {
            DomainGridError::timeout("DoH request", self.request_timeout.as_secs())
        } else {
            err.into()
        }
    }

    async fn fetch(&self, provider: &DohProvider, domain: &str, record_type: RecordType) -> Result<DnsQueryResult> {
        let response = self
            .client
            .get(&provider.url)
            .query(&[("name", domain), ("type", record_type.as_str())])
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let http_status = response.status();
        let body = response.text().await.map_err(|e| self.request_error(e))?;
        let parsed = serde_json::from_str::<DohResponse>(&body);

        if !http_status.is_success() {
            let mut result = DnsQueryResult::failed(provider, record_type, format!("HTTP {}", http_status.as_u16()));
            if let Ok(parsed) = parsed {
                result.dns_status = Some(parsed.status);
                result.answer_count = parsed.answer.len();
            }
            return Ok(result);
        }

        let parsed = parsed.map_err(|e| DomainGridError::parse(e.to_string(), Some(body)))?;
        Ok(DnsQueryResult::status(provider, record_type, parsed.status, parsed.answer.len()))
    }
}

#[async_trait]
impl DnsResolver for DohClient {
    async fn query(&self, provider: &DohProvider, domain: &str, record_type: RecordType) -> DnsQueryResult {
        match self.fetch(provider, domain, record_type).await {
            Ok(result) => {
                tracing::debug!(
                    domain = %domain,
                    provider = %provider.name,
                    record_type = %record_type,
                    dns_status = ?result.dns_status,
                    error = ?result.error,
                    "DoH query settled"
                );
                result
            }
            Err(e) => {
                tracing::debug!(domain = %domain, provider = %provider.name, record_type = %record_type, error = %e, "DoH query failed");
                DnsQueryResult::failed(provider, record_type, e.to_string())
            }
        }
    }
}

/// DoH JSON response, only the fields the classifier needs
#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> DohProvider {
        DohProvider::new("Mock", format!("{}/dns-query", server.uri()))
    }

    #[tokio::test]
    async fn test_noerror_with_answers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dns-query"))
            .and(query_param("name", "example.com"))
            .and(query_param("type", "A"))
            .and(header("accept", "application/dns-json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Status": 0,
                "Answer": [{"name": "example.com.", "type": 1, "TTL": 300, "data": "93.184.216.34"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DohClient::new(&CheckConfig::default()).unwrap();
        let result = client.query(&provider(&server), "example.com", RecordType::A).await;

        assert_eq!(result.dns_status, Some(0));
        assert_eq!(result.answer_count, 1);
        assert!(result.error.is_none());
        assert_eq!(result.provider, "Mock");
    }

    #[tokio::test]
    async fn test_nxdomain_without_answer_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("type", "NS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"Status": 3})))
            .mount(&server)
            .await;

        let client = DohClient::new(&CheckConfig::default()).unwrap();
        let result = client.query(&provider(&server), "nope-xyz.com", RecordType::NS).await;

        assert!(result.is_nxdomain());
        assert_eq!(result.answer_count, 0);
    }

    #[tokio::test]
    async fn test_http_error_preserves_parsed_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_json(serde_json::json!({"Status": 2})))
            .mount(&server)
            .await;

        let client = DohClient::new(&CheckConfig::default()).unwrap();
        let result = client.query(&provider(&server), "example.com", RecordType::A).await;

        assert_eq!(result.error.as_deref(), Some("HTTP 502"));
        assert_eq!(result.dns_status, Some(2));
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = DohClient::new(&CheckConfig::default()).unwrap();
        let result = client.query(&provider(&server), "example.com", RecordType::A).await;

        assert!(result.dns_status.is_none());
        assert!(result.error.unwrap().starts_with("Parse error"));
    }

    #[tokio::test]
    async fn test_timeout_reports_configured_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"Status": 3}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = CheckConfig::default().with_request_timeout(Duration::from_secs(1));
        let client = DohClient::new(&config).unwrap();
        let result = client.query(&provider(&server), "slow.com", RecordType::A).await;

        assert!(result.dns_status.is_none());
        let error = result.error.unwrap();
        assert!(error.contains("timed out after 1s"), "{}", error);
        assert!(!error.contains("30s"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_an_error() {
        let client = DohClient::new(&CheckConfig::default()).unwrap();
        let unreachable = DohProvider::new("Nowhere", "http://127.0.0.1:9/dns-query");
        let result = client.query(&unreachable, "example.com", RecordType::A).await;

        assert!(result.dns_status.is_none());
        assert!(result.error.is_some());
    }
}

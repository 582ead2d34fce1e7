//! HTTP transport.
//!
//! Providers describe their requests as [`HttpRequest`] values and hand them
//! to a [`Transport`]. [`HttpClient`] is the reqwest-backed implementation;
//! tests substitute [`crate::sources::mock::MockTransport`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::ProviderError;

/// HTTP method used by provider requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// A fully built request: method, URL, headers and optional body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// POST a JSON body
    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
        Self::post(url, body.to_string()).header("Content-Type", "application/json")
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value by case-insensitive name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status code and text body of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Turn a non-2xx response into [`ProviderError::Api`]
    pub fn error_for_status(self, provider: &str) -> Result<Self, ProviderError> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self.body.chars().take(200).collect();
        Err(ProviderError::Api {
            provider: provider.to_string(),
            status: self.status,
            message,
        })
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ProviderError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Executes provider requests
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError>;
}

/// Shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, ProviderError> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a client honouring the configured user agent and timeout
    pub fn from_config(config: &HttpConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        tracing::debug!(method = ?request.method, url = %request.url, "HTTP request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status, bytes = body.len(), url = %request.url, "HTTP response");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = HttpRequest::post_json("https://example.org", &serde_json::json!({"a": 1}))
            .header("Authorization", "JWT token");

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(request.header_value("authorization"), Some("JWT token"));
        assert_eq!(request.header_value("content-type"), Some("application/json"));
    }

    #[test]
    fn test_error_for_status() {
        assert!(HttpResponse::new(200, "ok").error_for_status("x").is_ok());

        let err = HttpResponse::new(503, "down").error_for_status("x").unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 503, .. }));
    }

    #[test]
    fn test_error_for_status_truncates_on_char_boundary() {
        let body = format!("{}é…{}", "a".repeat(199), "b".repeat(50));
        let err = HttpResponse::new(503, body).error_for_status("x").unwrap_err();

        match err {
            ProviderError::Api { message, .. } => {
                assert_eq!(message.chars().count(), 200);
                assert!(message.ends_with('é'));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_get_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/paper/abc")
            .with_status(200)
            .with_body(r#"{"title":"T"}"#)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let response = client
            .execute(HttpRequest::get(format!("{}/v1/paper/abc", server.url())))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"title":"T"}"#);
    }

    #[tokio::test]
    async fn test_execute_post_sends_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/dsl.json")
            .match_header("authorization", "JWT secret")
            .match_body("search publications")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let request = HttpRequest::post(format!("{}/api/dsl.json", server.url()), "search publications")
            .header("Authorization", "JWT secret");
        let response = client.execute(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 401);
        assert!(!response.is_success());
    }
}

//! Dimensions provider using the DSL search API.
//!
//! Every lookup authenticates first (`auth.json`) and sends DSL queries to
//! `dsl.json` with the returned token. Paged queries fetch at most
//! [`PAGE_SIZE`] rows per request and [`MAX_OVERALL_RESULTS`] rows in total.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Credentials;
use crate::models::{fields, PartialRecord, ProviderKind, Query};
use crate::sources::{Provider, ProviderCapabilities, ProviderError};
use crate::utils::{format_dimensions, matches, HttpRequest, HttpResponse, Transport};

const DIMENSIONS_AUTH_URL: &str = "https://app.dimensions.ai/api/auth.json";
const DIMENSIONS_DSL_URL: &str = "https://app.dimensions.ai/api/dsl.json";

/// Rows requested per DSL page
pub const PAGE_SIZE: usize = 1000;

/// Upper bound on rows collected by a paged query
pub const MAX_OVERALL_RESULTS: usize = 50_000;

/// Escape a string for use inside a DSL phrase
fn escape(text: &str) -> String {
    text.replace('"', "\\\"")
}

/// Exact-phrase search on titles
fn title_query(title: &str) -> String {
    format!(
        r#"search publications in title_only for "\"{}\"" return publications[all] limit {}"#,
        escape(title),
        PAGE_SIZE
    )
}

fn id_query(id: &str) -> String {
    format!(
        r#"search publications where id = "{}" return publications[all] limit 1"#,
        escape(id)
    )
}

/// Exact-phrase search on the full text, without paging clauses
fn full_text_query(term: &str) -> String {
    format!(
        r#"search publications in full_data for "\"{}\"" return publications[doi+title+journal+author_affiliations]"#,
        escape(term)
    )
}

/// Rows under `publications` in a DSL reply
fn publications(value: &Value) -> &[Value] {
    value
        .get("publications")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// An authenticated Dimensions API session
#[derive(Debug, Clone)]
pub struct DimensionsSession {
    transport: Arc<dyn Transport>,
    token: String,
}

impl DimensionsSession {
    /// Authenticate with username and password
    pub async fn connect(
        transport: Arc<dyn Transport>,
        username: &str,
        password: &str,
    ) -> Result<Self, ProviderError> {
        let request = HttpRequest::post_json(
            DIMENSIONS_AUTH_URL,
            &json!({ "username": username, "password": password }),
        );
        let response = transport.execute(request).await?;
        if matches!(response.status, 401 | 403) {
            return Err(ProviderError::Auth(format!(
                "Dimensions rejected the credentials ({})",
                response.status
            )));
        }

        let body: Value = response.error_for_status("dimensions")?.json()?;
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Auth("Dimensions returned no token".to_string()))?
            .to_string();

        tracing::debug!("Authenticated with Dimensions");
        Ok(Self { transport, token })
    }

    /// Attach the session token to a DSL request
    pub fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request.header("Authorization", format!("JWT {}", self.token))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        self.transport
            .execute(self.authorize(request))
            .await?
            .error_for_status("dimensions")
    }

    /// Run one DSL query
    pub async fn query(&self, dsl: &str) -> Result<Value, ProviderError> {
        tracing::debug!(dsl, "Dimensions query");
        self.send(HttpRequest::post(DIMENSIONS_DSL_URL, dsl)).await?.json()
    }

    /// Run a DSL query page by page, collecting every `publications` row
    pub async fn query_all(&self, dsl: &str) -> Result<Vec<Value>, ProviderError> {
        let mut rows = Vec::new();
        let mut skip = 0;

        while skip < MAX_OVERALL_RESULTS {
            let page = self
                .query(&format!("{} limit {} skip {}", dsl, PAGE_SIZE, skip))
                .await?;
            let hits = publications(&page);
            let total = page
                .get("_stats")
                .and_then(|stats| stats.get("total_count"))
                .and_then(Value::as_u64)
                .map(|n| n as usize);

            rows.extend(hits.iter().cloned());
            skip += PAGE_SIZE;

            if hits.len() < PAGE_SIZE || total.is_some_and(|total| skip >= total) {
                break;
            }
        }

        rows.truncate(MAX_OVERALL_RESULTS);
        Ok(rows)
    }
}

/// Dimensions provider
#[derive(Debug, Clone)]
pub struct DimensionsProvider {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
}

impl DimensionsProvider {
    pub fn new(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    async fn connect(&self) -> Result<DimensionsSession, ProviderError> {
        let (username, password) = self.credentials.require_dimensions(self.id())?;
        DimensionsSession::connect(Arc::clone(&self.transport), username, password).await
    }
}

#[async_trait]
impl Provider for DimensionsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Dimensions
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::TITLE_SEARCH
            | ProviderCapabilities::ID_LOOKUP
            | ProviderCapabilities::FULL_TEXT_SEARCH
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// The unauthenticated DSL request; a title takes precedence over an id
    fn build_request(&self, query: &Query) -> Result<HttpRequest, ProviderError> {
        let dsl = match (query.title(), query.identifier()) {
            (Some(title), _) => title_query(title),
            (None, Some(id)) => id_query(id),
            (None, None) => {
                return Err(ProviderError::InvalidQuery(
                    "Dimensions needs a title or publication id".to_string(),
                ))
            }
        };
        Ok(HttpRequest::post(DIMENSIONS_DSL_URL, dsl))
    }

    fn extract(&self, body: &str, query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let value: Value = serde_json::from_str(body)?;
        let hits = publications(&value);

        let hit = match query.title() {
            Some(title) => hits.iter().find(|hit| {
                matches(Some(title), hit.get(fields::TITLE).and_then(Value::as_str))
            }),
            None => hits.first(),
        };
        let Some(raw) = hit.and_then(Value::as_object) else {
            tracing::debug!(hits = hits.len(), "No Dimensions publication matched");
            return Ok(None);
        };

        let mut record = format_dimensions(raw);
        if let Some(title) = query.title() {
            record.insert(fields::TITLE, title);
        }
        Ok(Some(record))
    }

    async fn lookup(&self, query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let request = self.build_request(query)?;
        let session = self.connect().await?;
        let response = session.send(request).await?;
        self.extract(&response.body, query)
    }

    async fn full_text_search(&self, term: &str) -> Result<Vec<Value>, ProviderError> {
        let session = self.connect().await?;
        session.query_all(&full_text_query(term)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::MockTransport;
    use crate::utils::Method;

    fn credentials() -> Credentials {
        let mut credentials = Credentials::empty();
        credentials.email = Some("me@example.org".to_string());
        credentials.dimensions_password = Some("pw".to_string());
        credentials
    }

    fn authed_transport() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.respond(DIMENSIONS_AUTH_URL, 200, r#"{"token":"abc"}"#);
        transport
    }

    #[test]
    fn test_query_strings() {
        assert_eq!(
            title_query(r#"The "Best" Paper"#),
            r#"search publications in title_only for "\"The \"Best\" Paper\"" return publications[all] limit 1000"#
        );
        assert_eq!(
            id_query("pub.1091324289"),
            r#"search publications where id = "pub.1091324289" return publications[all] limit 1"#
        );
        assert!(full_text_query("x").starts_with(r#"search publications in full_data for "\"x\"""#));
    }

    #[tokio::test]
    async fn test_title_lookup_shapes_first_match() {
        let transport = authed_transport();
        transport.respond(
            DIMENSIONS_DSL_URL,
            200,
            r#"{"publications":[
                {"title":"Not it","doi":"10.1/no"},
                {"title":"Deal or No Deal?","doi":"10.1/yes","terms":["a","b"],"concepts":["b","c"],
                 "journal":{"id":"j1","title":"Appetite"},"linkout":"http://l","year":2017,"authors":[{"first_name":"L"}]},
                {"title":"deal or no deal","doi":"10.1/later"}
            ],"_stats":{"total_count":3}}"#,
        );

        let provider = DimensionsProvider::new(transport.clone(), credentials());
        let record = provider
            .lookup(&Query::by_title("deal or no deal"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.get_str(fields::DOI), Some("10.1/yes"));
        assert_eq!(record.get_str_list(fields::KEYWORDS), Some(vec!["a", "b", "c"]));
        assert_eq!(record.get_str(fields::JOURNAL_TITLE), Some("Appetite"));
        assert_eq!(record.get_str(fields::TITLE), Some("deal or no deal"));
        assert!(!record.contains("terms"));
        assert!(!record.contains("concepts"));
        assert!(!record.contains(fields::JOURNAL));
        assert!(!record.contains("year"));

        let requests = transport.requests();
        assert_eq!(requests[0].url, DIMENSIONS_AUTH_URL);
        assert!(requests[0].body.as_deref().unwrap().contains("me@example.org"));
        assert_eq!(requests[1].header_value("Authorization"), Some("JWT abc"));
        assert_eq!(requests[1].method, Method::Post);
    }

    #[tokio::test]
    async fn test_empty_results_are_none() {
        let transport = authed_transport();
        transport.respond(DIMENSIONS_DSL_URL, 200, r#"{"publications":[],"_stats":{"total_count":0}}"#);

        let provider = DimensionsProvider::new(transport, credentials());
        assert!(provider.lookup(&Query::by_title("Anything")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_id_lookup_has_no_gate() {
        let transport = authed_transport();
        transport.respond(
            DIMENSIONS_DSL_URL,
            200,
            r#"{"publications":[{"id":"pub.1","title":"Whatever","doi":"10.1/id"}]}"#,
        );

        let provider = DimensionsProvider::new(transport.clone(), credentials());
        let record = provider
            .lookup(&Query::by_identifier("pub.1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.get_str(fields::DOI), Some("10.1/id"));
        assert!(!record.contains(fields::TITLE));
        assert!(transport.requests()[1].body.as_deref().unwrap().contains(r#"where id = "pub.1""#));
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(DIMENSIONS_AUTH_URL, 401, r#"{"error":"bad"}"#);

        let provider = DimensionsProvider::new(transport, credentials());
        let err = provider.lookup(&Query::by_title("T")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth(_)));
    }

    #[tokio::test]
    async fn test_missing_password() {
        let mut creds = credentials();
        creds.dimensions_password = None;
        let transport = Arc::new(MockTransport::new());

        let provider = DimensionsProvider::new(transport.clone(), creds);
        let err = provider.lookup(&Query::by_title("T")).await.unwrap_err();
        assert!(err.is_missing_credential());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_full_text_pages_until_short_page() {
        let transport = authed_transport();
        let full_page: Vec<Value> = (0..PAGE_SIZE).map(|i| json!({ "title": format!("p{}", i) })).collect();
        transport.respond(
            DIMENSIONS_DSL_URL,
            200,
            json!({ "publications": full_page, "_stats": { "total_count": 1002 } }).to_string(),
        );
        transport.respond(
            DIMENSIONS_DSL_URL,
            200,
            r#"{"publications":[{"title":"last one"},{"title":"really last"}],"_stats":{"total_count":1002}}"#,
        );

        let provider = DimensionsProvider::new(transport.clone(), credentials());
        let hits = provider.full_text_search("price promotions").await.unwrap();
        assert_eq!(hits.len(), PAGE_SIZE + 2);

        let bodies: Vec<String> = transport
            .requests()
            .into_iter()
            .filter(|r| r.url == DIMENSIONS_DSL_URL)
            .filter_map(|r| r.body)
            .collect();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].ends_with("limit 1000 skip 0"));
        assert!(bodies[1].ends_with("limit 1000 skip 1000"));
    }
}

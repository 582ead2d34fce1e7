//! RePEc provider.
//!
//! Two steps: the IDEAS full-text search page yields the handle of the first
//! listed item, then the token-authenticated RePEc API returns the
//! reference for that handle. A query carrying an identifier is treated as
//! a handle and skips the search.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use serde_json::Value;
use std::sync::Arc;

use crate::config::Credentials;
use crate::models::{fields, PartialRecord, ProviderKind, Query};
use crate::sources::{require_title, selector, Provider, ProviderCapabilities, ProviderError};
use crate::utils::{first_object, HttpRequest, Transport};

const REPEC_SEARCH_URL: &str = "https://ideas.repec.org/cgi-bin/htsearch";
const REPEC_API_URL: &str = "https://api.repec.org/call.cgi";

/// RePEc provider
#[derive(Debug, Clone)]
pub struct RepecProvider {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
}

impl RepecProvider {
    pub fn new(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self { transport, credentials }
    }

    /// Search URL; the CGI chokes on parentheses and colons
    fn search_url(title: &str) -> String {
        let cleaned: String = title.chars().filter(|c| !matches!(c, '(' | ')' | ':')).collect();
        let encoded: String = url::form_urlencoded::byte_serialize(cleaned.as_bytes()).collect();
        format!("{}?q={}", REPEC_SEARCH_URL, encoded)
    }

    fn api_url(token: &str, handle: &str) -> String {
        format!("{}?code={}&getref={}", REPEC_API_URL, token, handle)
    }

    /// Handle of the first entry in the search result list
    pub(crate) fn find_handle(html: &str) -> Result<Option<String>, ProviderError> {
        let document = Html::parse_document(html);
        let list_selector = selector("ol.list-group")?;
        let italic = selector("i")?;

        let Some(list) = document.select(&list_selector).next() else {
            return Ok(None);
        };
        let Some(first) = list.children().filter_map(ElementRef::wrap).next() else {
            return Ok(None);
        };

        Ok(first
            .select(&italic)
            .next()
            .map(|i| i.text().collect::<String>().trim().to_string())
            .filter(|handle| !handle.is_empty()))
    }

    /// Step 1: find the handle for a title
    async fn search_handle(&self, title: &str) -> Result<Option<String>, ProviderError> {
        let response = self
            .transport
            .execute(HttpRequest::get(Self::search_url(title)))
            .await?
            .error_for_status(self.id())?;
        Self::find_handle(&response.body)
    }
}

#[async_trait]
impl Provider for RepecProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RePEc
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::TITLE_SEARCH | ProviderCapabilities::ID_LOOKUP
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// The handle search request
    fn build_request(&self, query: &Query) -> Result<HttpRequest, ProviderError> {
        let title = require_title(query, self.id())?;
        Ok(HttpRequest::get(Self::search_url(title)))
    }

    /// Decode the API reply for one handle
    fn extract(&self, body: &str, _query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let value: Value = serde_json::from_str(body)?;
        Ok(first_object(value))
    }

    async fn lookup(&self, query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let token = self.credentials.require_repec_token(self.id())?;

        let handle = match query.identifier() {
            Some(handle) => handle.to_string(),
            None => {
                let title = require_title(query, self.id())?;
                match self.search_handle(title).await? {
                    Some(handle) => handle,
                    None => {
                        tracing::debug!(title, "RePEc search returned no handle");
                        return Ok(None);
                    }
                }
            }
        };
        tracing::debug!(handle = %handle, "Fetching RePEc reference");

        let response = self
            .transport
            .execute(HttpRequest::get(Self::api_url(token, &handle)))
            .await?
            .error_for_status(self.id())?;

        let mut record = match self.extract(&response.body, query)? {
            Some(record) => record,
            None => return Ok(None),
        };
        if !record.contains(fields::HANDLE) {
            record.insert(fields::HANDLE, handle);
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::MockTransport;

    fn credentials(token: Option<&str>) -> Credentials {
        let mut credentials = Credentials::empty();
        credentials.repec_token = token.map(str::to_string);
        credentials
    }

    const TITLE: &str = "Estimating the 'True' Cost of Job Loss: Evidence Using Matched Data from California 1991-2000";

    const SEARCH_PAGE: &str = r#"<html><body>
        <ol class="list-group">
          <li class="list-group-item"><a href="/p/cen/wpaper/09-14.html">Estimating the True Cost of Job Loss</a>
            <br><i>RePEc:cen:wpaper:09-14</i></li>
          <li class="list-group-item"><i>RePEc:other:handle:1</i></li>
        </ol></body></html>"#;

    #[test]
    fn test_search_url_strips_and_plus_encodes() {
        let url = RepecProvider::search_url(TITLE);
        assert_eq!(
            url,
            "https://ideas.repec.org/cgi-bin/htsearch?q=Estimating+the+%27True%27+Cost+of+Job+Loss+Evidence+Using+Matched+Data+from+California+1991-2000"
        );
    }

    #[test]
    fn test_api_url_order() {
        assert_eq!(
            RepecProvider::api_url("tok", "RePEc:cen:wpaper:09-14"),
            "https://api.repec.org/call.cgi?code=tok&getref=RePEc:cen:wpaper:09-14"
        );
    }

    #[test]
    fn test_find_handle_takes_first_entry() {
        assert_eq!(
            RepecProvider::find_handle(SEARCH_PAGE).unwrap().as_deref(),
            Some("RePEc:cen:wpaper:09-14")
        );
        assert_eq!(RepecProvider::find_handle("<html><body><ol class=\"list-group\"></ol></body></html>").unwrap(), None);
        assert_eq!(RepecProvider::find_handle("<html><body>No results</body></html>").unwrap(), None);
    }

    #[tokio::test]
    async fn test_two_step_lookup() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(RepecProvider::search_url(TITLE), 200, SEARCH_PAGE);
        transport.respond(
            RepecProvider::api_url("tok", "RePEc:cen:wpaper:09-14"),
            200,
            r#"[{"title":"Estimating the True Cost of Job Loss","author":"Kevin L. McKinney","year":"2009"}]"#,
        );

        let provider = RepecProvider::new(transport.clone(), credentials(Some("tok")));
        let record = provider.lookup(&Query::by_title(TITLE)).await.unwrap().unwrap();

        assert_eq!(record.get_str("author"), Some("Kevin L. McKinney"));
        assert_eq!(record.get_str(fields::HANDLE), Some("RePEc:cen:wpaper:09-14"));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_identifier_skips_search() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            RepecProvider::api_url("tok", "RePEc:a:b:1"),
            200,
            r#"{"title":"Direct"}"#,
        );

        let provider = RepecProvider::new(transport.clone(), credentials(Some("tok")));
        let record = provider
            .lookup(&Query::by_identifier("RePEc:a:b:1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.get_str(fields::TITLE), Some("Direct"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_api_failure_is_typed_error() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(RepecProvider::api_url("tok", "h"), 200, "not json");

        let provider = RepecProvider::new(transport, credentials(Some("tok")));
        let err = provider.lookup(&Query::by_identifier("h")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_token() {
        let provider = RepecProvider::new(Arc::new(MockTransport::new()), credentials(None));
        let err = provider.lookup(&Query::by_title(TITLE)).await.unwrap_err();
        assert!(err.is_missing_credential());
    }
}

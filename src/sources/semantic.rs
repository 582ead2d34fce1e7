//! Semantic Scholar provider.
//!
//! Looks a paper up by identifier (a Semantic Scholar id, `arXiv:`-style id
//! or DOI) and returns the JSON object as-is.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::models::{PartialRecord, ProviderKind, Query};
use crate::sources::{Provider, ProviderCapabilities, ProviderError};
use crate::utils::{HttpRequest, Transport};

const SEMANTIC_SCHOLAR_PAPER_URL: &str = "http://api.semanticscholar.org/v1/paper";

/// Semantic Scholar provider
#[derive(Debug, Clone)]
pub struct SemanticScholarProvider {
    transport: Arc<dyn Transport>,
    api_key: Option<String>,
}

impl SemanticScholarProvider {
    pub fn new(transport: Arc<dyn Transport>, api_key: Option<String>) -> Self {
        Self { transport, api_key }
    }
}

#[async_trait]
impl Provider for SemanticScholarProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SemanticScholar
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::ID_LOOKUP
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn build_request(&self, query: &Query) -> Result<HttpRequest, ProviderError> {
        let identifier = query.identifier().or(query.doi()).ok_or_else(|| {
            ProviderError::InvalidQuery("Semantic Scholar needs an identifier or DOI".to_string())
        })?;

        let mut request = HttpRequest::get(format!("{}/{}", SEMANTIC_SCHOLAR_PAPER_URL, identifier));
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            request = request.header("x-api-key", key);
        }
        Ok(request)
    }

    fn extract(&self, body: &str, _query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let value: Value = serde_json::from_str(body)?;
        Ok(PartialRecord::from_json(value))
    }
}

//! Unpaywall provider: open-access status by DOI.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Credentials;
use crate::models::{PartialRecord, ProviderKind, Query};
use crate::sources::{Provider, ProviderCapabilities, ProviderError};
use crate::utils::{HttpRequest, Transport};

const UNPAYWALL_API_URL: &str = "https://api.unpaywall.org/v2";

/// Unpaywall provider
///
/// Every request carries the configured contact email.
#[derive(Debug, Clone)]
pub struct UnpaywallProvider {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
}

impl UnpaywallProvider {
    pub fn new(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self { transport, credentials }
    }
}

#[async_trait]
impl Provider for UnpaywallProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unpaywall
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::DOI_LOOKUP
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn build_request(&self, query: &Query) -> Result<HttpRequest, ProviderError> {
        let email = self.credentials.require_email(self.id())?;
        let doi = query
            .doi()
            .ok_or_else(|| ProviderError::InvalidQuery("Unpaywall needs a DOI".to_string()))?;

        Ok(HttpRequest::get(format!(
            "{}/{}?email={}",
            UNPAYWALL_API_URL, doi, email
        )))
    }

    fn extract(&self, body: &str, _query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let value: Value = serde_json::from_str(body)?;
        Ok(PartialRecord::from_json(value))
    }
}

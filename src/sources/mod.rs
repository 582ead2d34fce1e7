//! Provider adapters with an extensible trait-based architecture.
//!
//! This module defines the [`Provider`] trait that every metadata source
//! implements. A new provider is added by implementing the trait and
//! registering it with the [`ProviderRegistry`]; no other component changes.
//!
//! # Feature Flags
//!
//! Individual providers can be disabled at compile time using Cargo features:
//!
//! - `europepmc` - Europe PMC literature index (default: enabled)
//! - `openaire` - OpenAIRE open-access aggregator (default: enabled)
//! - `repec` - RePEc working-paper repository (default: enabled)
//! - `semantic` - Semantic Scholar citation graph (default: enabled)
//! - `unpaywall` - Unpaywall open-access lookup (default: enabled)
//! - `dimensions` - Dimensions search API (default: enabled)
//! - `ssrn` - SSRN, browser-driven (default: enabled)
//!
//! A provider disabled at compile time is unknown to the registry.
//!
//! # Failure semantics
//!
//! Adapters return `Ok(None)` when the provider answered but nothing passed
//! the title gate, and a typed [`ProviderError`] for transport or parse
//! failures. The registry logs those errors and reports "no result", except
//! for missing credentials, which fail the lookup.

#[cfg(feature = "source-dimensions")]
mod dimensions;
#[cfg(feature = "source-europepmc")]
mod europe_pmc;
#[cfg(feature = "source-openaire")]
mod openaire;
#[cfg(feature = "source-repec")]
mod repec;
#[cfg(feature = "source-semantic")]
mod semantic;
#[cfg(feature = "source-ssrn")]
mod ssrn;
#[cfg(feature = "source-unpaywall")]
mod unpaywall;

mod registry;

pub mod mock;

#[cfg(feature = "source-dimensions")]
pub use dimensions::{DimensionsProvider, DimensionsSession};
#[cfg(feature = "source-europepmc")]
pub use europe_pmc::EuropePmcProvider;
#[cfg(feature = "source-openaire")]
pub use openaire::OpenAireProvider;
#[cfg(feature = "source-repec")]
pub use repec::RepecProvider;
#[cfg(feature = "source-semantic")]
pub use semantic::SemanticScholarProvider;
#[cfg(feature = "source-ssrn")]
pub use ssrn::SsrnProvider;
#[cfg(feature = "source-unpaywall")]
pub use unpaywall::UnpaywallProvider;

pub use registry::{ProviderCapabilities, ProviderRegistry};

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{PartialRecord, ProviderKind, Query, QueryError};
use crate::utils::{HttpRequest, Transport};

/// The Provider trait defines the interface for all metadata providers.
///
/// # Implementing a New Provider
///
/// 1. Create a struct holding a [`Transport`] and any credentials
/// 2. Implement `kind`, `transport`, `build_request` and `extract`
/// 3. Override `lookup` when the provider needs more than one request
/// 4. Add the provider to `ProviderRegistry::with_transport`
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Which provider this adapter serves
    fn kind(&self) -> ProviderKind;

    /// Identifier used for dispatch (e.g. "europepmc")
    fn id(&self) -> &str {
        self.kind().id()
    }

    /// Human-readable name
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Describe the capabilities of this provider
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::TITLE_SEARCH
    }

    /// Transport used for the provider's requests
    fn transport(&self) -> &dyn Transport;

    /// Build the provider-specific request for a query
    fn build_request(&self, query: &Query) -> Result<HttpRequest, ProviderError>;

    /// Map a raw response body to a record, or `None` when nothing matches
    fn extract(&self, body: &str, query: &Query) -> Result<Option<PartialRecord>, ProviderError>;

    /// Resolve a query: build the request, execute it, extract the record.
    ///
    /// A 404 from the provider is "no result".
    async fn lookup(&self, query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let request = self.build_request(query)?;
        let response = self.transport().execute(request).await?;
        if response.is_not_found() {
            tracing::debug!(provider = self.id(), "Provider returned 404");
            return Ok(None);
        }
        let response = response.error_for_status(self.id())?;
        self.extract(&response.body, query)
    }

    /// Exact full-text search returning every raw hit
    async fn full_text_search(&self, _term: &str) -> Result<Vec<Value>, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}

/// Errors that can occur when interacting with a provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The requested operation is not implemented for this provider
    #[error("Operation not implemented for this provider")]
    NotImplemented,

    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with an unexpected status
    #[error("{provider} returned status {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// Parsing error (XML, JSON, HTML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The query lacks what this provider needs
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration lacks a required token, password or path
    #[error("Missing credential '{key}' required by {provider}")]
    MissingCredential { provider: String, key: String },

    /// Authentication with the provider failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Browser automation error
    #[error("Browser error: {0}")]
    Browser(String),
}

impl ProviderError {
    pub fn missing_credential(provider: impl Into<String>, key: impl Into<String>) -> Self {
        ProviderError::MissingCredential {
            provider: provider.into(),
            key: key.into(),
        }
    }

    pub fn is_missing_credential(&self) -> bool {
        matches!(self, ProviderError::MissingCredential { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for ProviderError {
    fn from(err: quick_xml::Error) -> Self {
        ProviderError::Parse(format!("XML: {}", err))
    }
}

impl From<QueryError> for ProviderError {
    fn from(err: QueryError) -> Self {
        ProviderError::InvalidQuery(err.to_string())
    }
}

/// Errors surfaced to callers of the registry
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No adapter is registered under this name
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// A required credential is not configured; no query can proceed
    #[error("Missing credential '{key}' required by {provider}")]
    MissingCredential { provider: String, key: String },

    /// The provider does not support the requested operation
    #[error("{provider} does not support {operation}")]
    Unsupported { provider: String, operation: String },

    /// Building the default transport failed
    #[error("Failed to initialise provider: {0}")]
    Init(#[source] ProviderError),
}

/// Compile a CSS selector for HTML scraping
#[allow(dead_code)]
pub(crate) fn selector(css: &str) -> Result<scraper::Selector, ProviderError> {
    scraper::Selector::parse(css)
        .map_err(|e| ProviderError::Parse(format!("Invalid selector '{}': {:?}", css, e)))
}

/// Title a provider needs, or an `InvalidQuery` error naming the provider
pub(crate) fn require_title<'a>(query: &'a Query, provider: &str) -> Result<&'a str, ProviderError> {
    query
        .title()
        .ok_or_else(|| ProviderError::InvalidQuery(format!("{} needs a title", provider)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_capabilities() {
        let caps = ProviderCapabilities::TITLE_SEARCH | ProviderCapabilities::DOI_LOOKUP;

        assert!(caps.contains(ProviderCapabilities::TITLE_SEARCH));
        assert!(caps.contains(ProviderCapabilities::DOI_LOOKUP));
        assert!(!caps.contains(ProviderCapabilities::FULL_TEXT_SEARCH));
    }

    #[test]
    fn test_missing_credential_helpers() {
        let err = ProviderError::missing_credential("repec", "credentials.repec_token");
        assert!(err.is_missing_credential());
        assert_eq!(
            err.to_string(),
            "Missing credential 'credentials.repec_token' required by repec"
        );
        assert!(!ProviderError::Parse("x".into()).is_missing_credential());
    }

    #[test]
    fn test_require_title() {
        assert_eq!(require_title(&Query::by_title("T"), "x").unwrap(), "T");
        assert!(matches!(
            require_title(&Query::by_doi("10.1/x"), "x"),
            Err(ProviderError::InvalidQuery(_))
        ));
    }
}

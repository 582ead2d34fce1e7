//! Registry and dispatcher for provider adapters.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Provider, ProviderError, ResolveError};
use crate::config::Config;
use crate::models::{PartialRecord, ProviderKind, Query};
use crate::utils::{BrowserLauncher, HttpClient, Transport, WebDriverLauncher};

bitflags::bitflags! {
    /// Operations a provider supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProviderCapabilities: u32 {
        const TITLE_SEARCH = 1 << 0;
        const DOI_LOOKUP = 1 << 1;
        const ID_LOOKUP = 1 << 2;
        const FULL_TEXT_SEARCH = 1 << 3;
        const BROWSER = 1 << 4;
    }
}

impl ProviderCapabilities {
    /// Short labels for display
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.contains(Self::TITLE_SEARCH) {
            labels.push("title");
        }
        if self.contains(Self::DOI_LOOKUP) {
            labels.push("doi");
        }
        if self.contains(Self::ID_LOOKUP) {
            labels.push("id");
        }
        if self.contains(Self::FULL_TEXT_SEARCH) {
            labels.push("full-text");
        }
        if self.contains(Self::BROWSER) {
            labels.push("browser");
        }
        labels
    }
}

/// Registry of provider adapters, keyed by [`ProviderKind`]
///
/// Lookups are dispatched by case-insensitive provider name. Provider errors
/// are logged and reported as "no result", except missing credentials.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderKind, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Registry with no providers
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry of every compiled-in provider using the reqwest transport and
    /// the WebDriver browser launcher
    pub fn from_config(config: &Config) -> Result<Self, ResolveError> {
        let client = HttpClient::from_config(&config.http).map_err(ResolveError::Init)?;
        let transport: Arc<dyn Transport> = Arc::new(client);
        let launcher = Arc::new(WebDriverLauncher::new(Arc::clone(&transport), &config.browser));
        Ok(Self::with_transport(config, transport, launcher))
    }

    /// Registry of every compiled-in provider over the given transport and launcher
    #[allow(unused_variables)]
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn Transport>,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Self {
        let mut registry = Self::empty();
        let credentials = &config.credentials;

        #[cfg(feature = "source-europepmc")]
        registry.register(Arc::new(super::EuropePmcProvider::new(Arc::clone(&transport))));

        #[cfg(feature = "source-openaire")]
        registry.register(Arc::new(super::OpenAireProvider::new(Arc::clone(&transport))));

        #[cfg(feature = "source-repec")]
        registry.register(Arc::new(super::RepecProvider::new(
            Arc::clone(&transport),
            credentials.clone(),
        )));

        #[cfg(feature = "source-semantic")]
        registry.register(Arc::new(super::SemanticScholarProvider::new(
            Arc::clone(&transport),
            credentials.semantic_scholar_api_key.clone(),
        )));

        #[cfg(feature = "source-unpaywall")]
        registry.register(Arc::new(super::UnpaywallProvider::new(
            Arc::clone(&transport),
            credentials.clone(),
        )));

        #[cfg(feature = "source-dimensions")]
        registry.register(Arc::new(super::DimensionsProvider::new(
            Arc::clone(&transport),
            credentials.clone(),
        )));

        #[cfg(feature = "source-ssrn")]
        registry.register(Arc::new(super::SsrnProvider::new(
            Arc::clone(&transport),
            Arc::clone(&launcher),
        )));

        registry
    }

    /// Register a provider, replacing any adapter of the same kind
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.kind(), provider);
    }

    /// Get a provider by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        let kind = name.parse::<ProviderKind>().ok()?;
        self.providers.get(&kind)
    }

    /// Get a provider by name, failing with [`ResolveError::UnknownProvider`]
    pub fn get_required(&self, name: &str) -> Result<&Arc<dyn Provider>, ResolveError> {
        self.get(name)
            .ok_or_else(|| ResolveError::UnknownProvider(name.to_string()))
    }

    /// Resolve a query with the named provider.
    ///
    /// Returns `Ok(None)` when the provider has no matching record or failed
    /// for a reason other than missing credentials.
    pub async fn lookup(
        &self,
        query: &Query,
        provider: &str,
    ) -> Result<Option<PartialRecord>, ResolveError> {
        let adapter = self.get_required(provider)?;
        tracing::debug!(provider = adapter.id(), ?query, "Dispatching lookup");

        match adapter.lookup(query).await {
            Ok(record) => Ok(record),
            Err(ProviderError::MissingCredential { provider, key }) => {
                Err(ResolveError::MissingCredential { provider, key })
            }
            Err(err) => {
                tracing::warn!(provider = adapter.id(), error = %err, "Lookup failed, reporting no result");
                Ok(None)
            }
        }
    }

    /// Exact full-text search with the named provider, returning every hit
    pub async fn full_text_search(
        &self,
        term: &str,
        provider: &str,
    ) -> Result<Vec<Value>, ResolveError> {
        let adapter = self.get_required(provider)?;
        let unsupported = || ResolveError::Unsupported {
            provider: adapter.id().to_string(),
            operation: "full-text search".to_string(),
        };

        if !adapter
            .capabilities()
            .contains(ProviderCapabilities::FULL_TEXT_SEARCH)
        {
            return Err(unsupported());
        }

        match adapter.full_text_search(term).await {
            Ok(hits) => Ok(hits),
            Err(ProviderError::NotImplemented) => Err(unsupported()),
            Err(ProviderError::MissingCredential { provider, key }) => {
                Err(ResolveError::MissingCredential { provider, key })
            }
            Err(err) => {
                tracing::warn!(provider = adapter.id(), error = %err, "Full-text search failed, reporting no hits");
                Ok(Vec::new())
            }
        }
    }

    /// All registered providers, in [`ProviderKind`] order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.values()
    }

    /// Identifiers of the registered providers
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(|k| k.id())
    }

    /// Providers that support a specific capability
    pub fn with_capability(&self, capability: ProviderCapabilities) -> Vec<&Arc<dyn Provider>> {
        self.all()
            .filter(|p| p.capabilities().contains(capability))
            .collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::sources::mock::{MockTransport, NoBrowser};

    fn registry(transport: Arc<MockTransport>, credentials: Credentials) -> ProviderRegistry {
        let config = Config {
            credentials,
            ..Config::default()
        };
        ProviderRegistry::with_transport(&config, transport, Arc::new(NoBrowser))
    }

    fn expected_count() -> usize {
        [
            cfg!(feature = "source-europepmc"),
            cfg!(feature = "source-openaire"),
            cfg!(feature = "source-repec"),
            cfg!(feature = "source-semantic"),
            cfg!(feature = "source-unpaywall"),
            cfg!(feature = "source-dimensions"),
            cfg!(feature = "source-ssrn"),
        ]
        .iter()
        .filter(|enabled| **enabled)
        .count()
    }

    #[test]
    fn test_registry_basic() {
        let registry = registry(Arc::new(MockTransport::new()), Credentials::empty());
        assert_eq!(registry.len(), expected_count());
        assert_eq!(registry.is_empty(), expected_count() == 0);
    }

    #[test]
    fn test_ids_follow_kind_order() {
        let registry = registry(Arc::new(MockTransport::new()), Credentials::empty());
        let ids: Vec<&str> = registry.ids().collect();
        let expected: Vec<&str> = ProviderKind::ALL
            .iter()
            .filter(|k| registry.providers.contains_key(*k))
            .map(|k| k.id())
            .collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let registry = registry(Arc::new(MockTransport::new()), Credentials::empty());
        let result = registry.lookup(&Query::by_title("Anything"), "scopus").await;
        assert!(matches!(result, Err(ResolveError::UnknownProvider(name)) if name == "scopus"));
    }

    #[test]
    fn test_empty_registry_knows_nothing() {
        let registry = ProviderRegistry::empty();
        assert!(registry.get("europepmc").is_none());
        assert!(matches!(
            registry.get_required("europepmc"),
            Err(ResolveError::UnknownProvider(_))
        ));
    }

    #[cfg(feature = "source-europepmc")]
    #[tokio::test]
    async fn test_name_is_case_insensitive_and_errors_map_to_none() {
        // No canned response: the transport fails with a network error
        let transport = Arc::new(MockTransport::new());
        let registry = registry(transport.clone(), Credentials::empty());

        assert!(registry.has("EuropePMC"));
        let result = registry.lookup(&Query::by_title("Some Title"), "EUROPEPMC").await;
        assert!(matches!(result, Ok(None)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[cfg(feature = "source-repec")]
    #[tokio::test]
    async fn test_missing_credential_fails_fast() {
        let transport = Arc::new(MockTransport::new());
        let registry = registry(transport.clone(), Credentials::empty());

        let result = registry.lookup(&Query::by_title("Some Title"), "repec").await;
        assert!(matches!(
            result,
            Err(ResolveError::MissingCredential { ref provider, .. }) if provider == "repec"
        ));
        assert!(transport.requests().is_empty());
    }

    #[cfg(feature = "source-europepmc")]
    #[tokio::test]
    async fn test_full_text_unsupported() {
        let registry = registry(Arc::new(MockTransport::new()), Credentials::empty());
        let result = registry.full_text_search("term", "europepmc").await;
        assert!(matches!(result, Err(ResolveError::Unsupported { .. })));
    }

    #[test]
    fn test_capability_labels() {
        let caps = ProviderCapabilities::TITLE_SEARCH | ProviderCapabilities::BROWSER;
        assert_eq!(caps.labels(), vec!["title", "browser"]);
    }
}

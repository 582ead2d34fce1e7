//! EuropePMC provider using the REST search API (XML).
//!
//! EuropePMC indexes PubMed, PMC, and preprints from bioRxiv/medRxiv.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{fields, Author, PartialRecord, ProviderKind, Query};
use crate::sources::{require_title, Provider, ProviderCapabilities, ProviderError};
use crate::utils::{matches, HttpRequest, Transport, XmlNode};

/// EuropePMC REST search endpoint
const EUROPE_PMC_SEARCH_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";

/// Rendered PDF link for a PMC article
const EUROPE_PMC_PDF_URL: &str = "http://europepmc.org/articles";

/// EuropePMC provider
///
/// Searches by title and keeps the last result whose title matches.
#[derive(Debug, Clone)]
pub struct EuropePmcProvider {
    transport: Arc<dyn Transport>,
}

impl EuropePmcProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build search URL
    fn search_url(title: &str) -> String {
        format!("{}?query={}", EUROPE_PMC_SEARCH_URL, urlencoding::encode(title))
    }

    /// Map one `<result>` entry to a record
    fn parse_result(result: &XmlNode) -> PartialRecord {
        let mut record = PartialRecord::new();
        let pmcid = result.child_text("pmcid");

        record.insert_opt(fields::DOI, result.child_text("doi"));
        record.insert_opt(fields::PMCID, pmcid.clone());
        record.insert_opt(fields::JOURNAL, result.child_text("journalTitle"));

        if let Some(authors) = result.child_text("authorString") {
            record.set_authors(authors.split(", ").map(Author::new).collect());
        }

        if result.child_text("hasPDF").as_deref() == Some("Y") {
            if let Some(pmcid) = pmcid {
                record.insert(
                    fields::PDF_URL,
                    format!("{}/{}?pdf=render", EUROPE_PMC_PDF_URL, pmcid),
                );
            }
        }

        record
    }
}

#[async_trait]
impl Provider for EuropePmcProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::EuropePmc
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::TITLE_SEARCH
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn build_request(&self, query: &Query) -> Result<HttpRequest, ProviderError> {
        let title = require_title(query, self.id())?;
        Ok(HttpRequest::get(Self::search_url(title)))
    }

    fn extract(&self, body: &str, query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let title = require_title(query, self.id())?;
        let doc = XmlNode::parse(body)?;

        // Later matches replace earlier ones
        let mut found = None;
        for result in doc.find_all("result") {
            let candidate = result.child_text("title");
            if matches(Some(title), candidate.as_deref()) {
                found = Some(Self::parse_result(result));
            } else {
                tracing::trace!(candidate = ?candidate, "EuropePMC title did not match");
            }
        }

        Ok(found.filter(|record| !record.is_empty()))
    }
}

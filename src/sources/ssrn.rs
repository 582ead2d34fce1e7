//! SSRN provider.
//!
//! SSRN has no search API. A title search drives a browser through the SSRN
//! home page search form and takes the first result link; the article page
//! is then fetched over HTTP and its `citation_*` meta tags scraped. Queries
//! carrying an SSRN DOI (`10.2139/ssrn.<id>`) or an SSRN URL go straight to
//! the article page.

use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;

use crate::models::{fields, Author, PartialRecord, ProviderKind, Query};
use crate::sources::{require_title, selector, Provider, ProviderCapabilities, ProviderError};
use crate::utils::{matches, BrowserLauncher, HttpRequest, PageDriver, Transport};

/// SSRN home page with the search form
pub const SSRN_HOME_URL: &str = "https://www.ssrn.com/index.cfm/en/";

/// Article page for an abstract id
const SSRN_ABSTRACT_URL: &str = "https://papers.ssrn.com/sol3/papers.cfm?abstract_id=";

/// Search box on the home page
pub const SEARCH_BOX_SELECTOR: &str = ".form-control";

/// Title link of a search result
pub const RESULT_LINK_SELECTOR: &str = "[class='title optClickTitle']";

const SSRN_DOI_MARKER: &str = "ssrn.";

/// SSRN provider
#[derive(Debug, Clone)]
pub struct SsrnProvider {
    transport: Arc<dyn Transport>,
    launcher: Arc<dyn BrowserLauncher>,
}

impl SsrnProvider {
    pub fn new(transport: Arc<dyn Transport>, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            transport,
            launcher,
        }
    }

    /// Article URL derivable from the query without searching
    fn direct_url(query: &Query) -> Option<String> {
        if let Some(identifier) = query.identifier() {
            let lower = identifier.to_ascii_lowercase();
            if lower.starts_with("http") && lower.contains("ssrn") {
                return Some(identifier.to_string());
            }
        }

        let doi = query.doi()?;
        let lower = doi.to_ascii_lowercase();
        let start = lower.find(SSRN_DOI_MARKER)? + SSRN_DOI_MARKER.len();
        let id = doi[start..].trim();
        if id.is_empty() {
            return None;
        }
        Some(format!("{}{}", SSRN_ABSTRACT_URL, id))
    }

    /// Find the first search result link for a title with the browser.
    ///
    /// The session is closed whether or not the search succeeds.
    async fn search(&self, title: &str) -> Result<Option<String>, ProviderError> {
        let mut driver = self.launcher.launch().await?;
        let result = Self::first_result_link(driver.as_mut(), title).await;

        if let Err(err) = driver.close().await {
            tracing::warn!(error = %err, "Failed to close SSRN browser session");
        }
        result
    }

    async fn first_result_link(
        driver: &mut dyn PageDriver,
        title: &str,
    ) -> Result<Option<String>, ProviderError> {
        driver.open(SSRN_HOME_URL).await?;
        driver.submit_search(SEARCH_BOX_SELECTOR, title).await?;

        let results_url = driver.current_url().await?;
        driver.open(&results_url).await?;

        match driver.find_element(RESULT_LINK_SELECTOR).await? {
            Some(link) => driver.attribute(&link, "href").await,
            None => Ok(None),
        }
    }

    /// Scrape an article page. A page without `citation_title` is not an article.
    pub(crate) fn parse_article(
        html: &str,
        url: Option<&str>,
    ) -> Result<Option<PartialRecord>, ProviderError> {
        let document = Html::parse_document(html);

        let Some(title) = meta_content(&document, "citation_title")? else {
            return Ok(None);
        };

        let mut record = PartialRecord::new();
        record.insert(fields::TITLE, title);

        if let Some(keywords) = meta_content(&document, "citation_keywords")? {
            let keywords: Vec<String> = keywords
                .split(", ")
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            record.insert(fields::KEYWORDS, keywords);
        }

        record.insert_opt(fields::DOI, meta_content(&document, "citation_doi")?);

        if let Some(authors) = authors(&document)? {
            record.set_authors(authors);
        }
        record.insert_opt(fields::URL, url);

        Ok(Some(record))
    }

    /// Apply the title gate to a scraped record when it came from a title search
    fn accept(
        record: Option<PartialRecord>,
        query: &Query,
        gated: bool,
    ) -> Option<PartialRecord> {
        let record = record?;
        if gated && !matches(query.title(), record.get_str(fields::TITLE)) {
            tracing::debug!(scraped = ?record.get_str(fields::TITLE), "SSRN title did not match");
            return None;
        }
        Some(record)
    }
}

fn meta_content(document: &Html, name: &str) -> Result<Option<String>, ProviderError> {
    let meta = selector(&format!("meta[name='{}']", name))?;
    Ok(document
        .select(&meta)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string()))
}

/// Authors from the author block: leaf `a`/`p` elements alternate
/// name, affiliation.
fn authors(document: &Html) -> Result<Option<Vec<Author>>, ProviderError> {
    let block = selector("[class='authors authors-full-width']")?;
    let leaves = selector("a, p")?;

    let Some(block) = document.select(&block).next() else {
        return Ok(None);
    };

    let texts: Vec<String> = block
        .select(&leaves)
        .filter(|element| element.children().count() == 1)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect();

    let authors = texts
        .chunks(2)
        .filter_map(|pair| {
            let name = pair.first()?.clone();
            Some(match pair.get(1) {
                Some(affiliation) => Author::with_affiliation(name, affiliation.clone()),
                None => Author::new(name),
            })
        })
        .collect();

    Ok(Some(authors))
}

#[async_trait]
impl Provider for SsrnProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ssrn
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::TITLE_SEARCH
            | ProviderCapabilities::DOI_LOOKUP
            | ProviderCapabilities::ID_LOOKUP
            | ProviderCapabilities::BROWSER
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Article page request for a DOI or URL query; title queries need the browser
    fn build_request(&self, query: &Query) -> Result<HttpRequest, ProviderError> {
        Self::direct_url(query).map(HttpRequest::get).ok_or_else(|| {
            ProviderError::InvalidQuery("SSRN title search runs through the browser".to_string())
        })
    }

    /// Parse an article page; pages reached by title are gated on `citation_title`
    fn extract(&self, body: &str, query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let direct = Self::direct_url(query);
        let record = Self::parse_article(body, direct.as_deref())?;
        Ok(Self::accept(record, query, direct.is_none()))
    }

    async fn lookup(&self, query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let (url, gated) = match Self::direct_url(query) {
            Some(url) => (url, false),
            None => {
                let title = require_title(query, self.id())?;
                match self.search(title).await? {
                    Some(url) => (url, true),
                    None => {
                        tracing::debug!(title, "SSRN search returned no result link");
                        return Ok(None);
                    }
                }
            }
        };

        tracing::debug!(url = %url, "Fetching SSRN article page");
        let response = self.transport.execute(HttpRequest::get(url.clone())).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        let response = response.error_for_status(self.id())?;

        let record = Self::parse_article(&response.body, Some(&url))?;
        Ok(Self::accept(record, query, gated))
    }
}

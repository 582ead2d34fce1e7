//! OpenAIRE provider using the publication search API (XML).

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{fields, Author, PartialRecord, ProviderKind, Query};
use crate::sources::{require_title, Provider, ProviderCapabilities, ProviderError};
use crate::utils::{matches, HttpRequest, Transport, XmlNode};

const OPENAIRE_SEARCH_URL: &str = "http://api.openaire.eu/search/publications";

/// Access-right class marking open access
const OPEN_ACCESS_CLASS: &str = "OPEN";

/// OpenAIRE provider
#[derive(Debug, Clone)]
pub struct OpenAireProvider {
    transport: Arc<dyn Transport>,
}

impl OpenAireProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn parse_result(result: &XmlNode) -> PartialRecord {
        let mut record = PartialRecord::new();
        record.insert_opt(fields::URL, result.child_text("url"));

        let authors = result
            .find_all("creator")
            .into_iter()
            .map(|creator| creator.text().trim().to_string())
            .filter(|name| !name.is_empty())
            .map(Author::new)
            .collect();
        record.set_authors(authors);

        let open = result
            .find_all("bestaccessright")
            .iter()
            .any(|right| right.attribute("classid") == Some(OPEN_ACCESS_CLASS));
        record.insert(fields::OPEN_ACCESS, open);

        record
    }
}

#[async_trait]
impl Provider for OpenAireProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAire
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::TITLE_SEARCH
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn build_request(&self, query: &Query) -> Result<HttpRequest, ProviderError> {
        let title = require_title(query, self.id())?;
        Ok(HttpRequest::get(format!(
            "{}?title={}",
            OPENAIRE_SEARCH_URL,
            urlencoding::encode(title)
        )))
    }

    fn extract(&self, body: &str, query: &Query) -> Result<Option<PartialRecord>, ProviderError> {
        let title = require_title(query, self.id())?;
        let doc = XmlNode::parse(body)?;

        let found = doc
            .find_all("oaf:result")
            .into_iter()
            .find(|result| matches(Some(title), result.child_text("title").as_deref()));

        Ok(found.map(Self::parse_result))
    }
}

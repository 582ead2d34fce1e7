//! Lookup query model.

use serde::{Deserialize, Serialize};

/// What to look up: a title, a DOI, a provider identifier, or any mix
///
/// At least one field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    title: Option<String>,
    doi: Option<String>,
    identifier: Option<String>,
}

/// Errors raised when building a query
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Query needs at least one of title, DOI or identifier")]
    Empty,
}

impl Query {
    /// Build a query from optional parts; blank values count as absent.
    pub fn new(
        title: Option<String>,
        doi: Option<String>,
        identifier: Option<String>,
    ) -> Result<Self, QueryError> {
        let query = Self {
            title: non_blank(title),
            doi: non_blank(doi),
            identifier: non_blank(identifier),
        };

        if query.title.is_none() && query.doi.is_none() && query.identifier.is_none() {
            return Err(QueryError::Empty);
        }
        Ok(query)
    }

    /// Query by publication title
    pub fn by_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            doi: None,
            identifier: None,
        }
    }

    /// Query by DOI
    pub fn by_doi(doi: impl Into<String>) -> Self {
        Self {
            title: None,
            doi: Some(doi.into()),
            identifier: None,
        }
    }

    /// Query by a provider identifier (Semantic Scholar ID, RePEc handle, Dimensions ID, SSRN URL)
    pub fn by_identifier(identifier: impl Into<String>) -> Self {
        Self {
            title: None,
            doi: None,
            identifier: Some(identifier.into()),
        }
    }

    /// Add a DOI to the query
    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    /// Add an identifier to the query
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// DOI with common `https://doi.org/` and `doi:` prefixes removed
    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref().map(|doi| {
            let doi = doi.trim();
            doi.strip_prefix("https://doi.org/")
                .or_else(|| doi.strip_prefix("http://doi.org/"))
                .or_else(|| doi.strip_prefix("doi:"))
                .unwrap_or(doi)
        })
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref().map(str::trim)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

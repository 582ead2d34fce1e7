//! Provider identity.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The external source a lookup is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    EuropePmc,
    OpenAire,
    RePEc,
    SemanticScholar,
    Unpaywall,
    Dimensions,
    Ssrn,
}

impl ProviderKind {
    /// Every known provider, in registry order
    pub const ALL: [ProviderKind; 7] = [
        ProviderKind::EuropePmc,
        ProviderKind::OpenAire,
        ProviderKind::RePEc,
        ProviderKind::SemanticScholar,
        ProviderKind::Unpaywall,
        ProviderKind::Dimensions,
        ProviderKind::Ssrn,
    ];

    /// Returns the display name of the provider
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::EuropePmc => "Europe PMC",
            ProviderKind::OpenAire => "OpenAIRE",
            ProviderKind::RePEc => "RePEc",
            ProviderKind::SemanticScholar => "Semantic Scholar",
            ProviderKind::Unpaywall => "Unpaywall",
            ProviderKind::Dimensions => "Dimensions",
            ProviderKind::Ssrn => "SSRN",
        }
    }

    /// Returns the provider identifier used for dispatch
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::EuropePmc => "europepmc",
            ProviderKind::OpenAire => "openaire",
            ProviderKind::RePEc => "repec",
            ProviderKind::SemanticScholar => "semanticscholar",
            ProviderKind::Unpaywall => "unpaywall",
            ProviderKind::Dimensions => "dimensions",
            ProviderKind::Ssrn => "ssrn",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a provider name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider: {0}")]
pub struct UnknownProviderName(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProviderName;

    /// Case-insensitive; accepts the id plus a few common spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "europepmc" | "epmc" => Ok(ProviderKind::EuropePmc),
            "openaire" => Ok(ProviderKind::OpenAire),
            "repec" | "ideas" => Ok(ProviderKind::RePEc),
            "semanticscholar" | "semantic" | "s2" => Ok(ProviderKind::SemanticScholar),
            "unpaywall" => Ok(ProviderKind::Unpaywall),
            "dimensions" => Ok(ProviderKind::Dimensions),
            "ssrn" => Ok(ProviderKind::Ssrn),
            _ => Err(UnknownProviderName(s.to_string())),
        }
    }
}

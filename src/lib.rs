//! # Research Resolver
//!
//! Resolve bibliographic metadata (authors, DOI, journal, open-access status,
//! keywords) for a publication by querying one of several external providers
//! and normalizing the response into a [`PartialRecord`].
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Query, PartialRecord, ProviderKind)
//! - [`sources`]: Provider adapters behind the [`Provider`] trait and the
//!   [`ProviderRegistry`] that dispatches lookups by name
//! - [`utils`]: HTTP transport, title matching, record consolidation, XML
//!   tree and browser driver
//! - [`config`]: Configuration and credential loading
//!
//! ## Example
//!
//! ```rust,no_run
//! use research_resolver::config::Config;
//! use research_resolver::models::Query;
//! use research_resolver::sources::ProviderRegistry;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ProviderRegistry::from_config(&Config::default())?;
//! let query = Query::by_title("Deal or no deal? The prevalence and nutritional quality of price promotions");
//!
//! if let Some(record) = registry.lookup(&query, "europepmc").await? {
//!     println!("{}", serde_json::to_string_pretty(&record)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{PartialRecord, ProviderKind, Query};
pub use sources::{Provider, ProviderError, ProviderRegistry, ResolveError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

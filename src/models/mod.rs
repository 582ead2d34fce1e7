//! Core data models for metadata lookups.

mod provider;
mod query;
mod record;

pub use provider::{ProviderKind, UnknownProviderName};
pub use query::{Query, QueryError};
pub use record::{fields, Author, PartialRecord};

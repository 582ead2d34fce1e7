//! Utility modules supporting provider lookups.
//!
//! - [`normalize`] / [`matches`]: title normalization and the title gate
//! - [`format_dimensions`], [`allow_list`], [`keyword_union`]: record consolidation
//! - [`HttpClient`]: reqwest-backed [`Transport`]
//! - [`XmlNode`]: owned XML tree for XML payloads
//! - [`PageDriver`] / [`WebDriverLauncher`]: browser sessions for SSRN
//!
//! # Title matching
//!
//! ```rust
//! use research_resolver::utils::{matches, normalize};
//!
//! assert_eq!(normalize("  Deal or No Deal? "), "deal or no deal");
//! assert!(matches(Some("Deal or No Deal?"), Some("deal or no deal")));
//! assert!(!matches(None, Some("deal or no deal")));
//! ```

pub mod browser;
pub mod consolidate;
pub mod http;
pub mod title;
pub mod xml;

pub use browser::{BrowserLauncher, PageDriver, PageElement, WebDriverLauncher};
pub use consolidate::{allow_list, first_object, format_dimensions, keyword_union};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, Transport};
pub use title::{matches, normalize};
pub use xml::XmlNode;

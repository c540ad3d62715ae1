//! Citation extraction and classification.
//!
//! Turns the URLs an answer engine reports (structurally or inline in its
//! text) into a ranked, de-duplicated list, then labels each one as a brand,
//! competitor, or third-party citation.

pub mod classify;
pub mod domain;
pub mod extract;

pub use classify::{classify_citations, has_brand_citation, ClassificationInput};
pub use domain::{canonicalize_url, domain_matches, normalize_domain};
pub use extract::{extract_citations, ExtractionInput};

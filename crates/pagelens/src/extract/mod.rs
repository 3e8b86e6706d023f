//! Extraction building blocks.
//!
//! - `cascade`: ordered per-field selector lists run against a live page.
//! - `sources`: JSON-LD and meta tag readers over the page HTML.
//! - `fusion`: merges the independent metadata sources.
//! - `readability`: scored main-content fallback.
//! - `dates`: date normalisation.

pub mod cascade;
pub mod dates;
pub mod fusion;
pub mod readability;
pub mod sources;

pub use cascade::{ContentExtractor, ExtractionAttempt};
pub use dates::{normalize_date, parse_date};
pub use fusion::{fuse, FusedMetadata, MetadataBag, MetadataSource, MetadataSources};
pub use readability::extract_main_content;
pub use sources::{structured_data, StructuredData};

// ABOUTME: Main library entry point for the pagelens article extraction engine.
// ABOUTME: Re-exports the public API: Engine, EngineBuilder, ArticleContent, FetchError and the scoring helpers.

//! pagelens - article content extraction and quality scoring.
//!
//! Given an article URL, pagelens loads the page through a page backend,
//! extracts title, body and metadata with per-site selector cascades plus
//! structured data and meta tags, and scores how complete and trustworthy the
//! result is. Failures come back classified with retry guidance.
//!
//! # Example
//!
//! ```no_run
//! use pagelens::{fetch_article_content, generate_rating_prompt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let url = "https://zenn.dev/someone/articles/abc";
//!     let article = fetch_article_content(url).await.ok();
//!     println!("{}", generate_rating_prompt(article.as_ref(), url));
//! }
//! ```

pub mod browser;
pub mod classify;
pub mod content;
pub(crate) mod duration_ms;
pub mod error;
pub mod extract;
pub mod options;
pub mod orchestrator;
pub mod prompt;
pub mod scoring;
pub mod site;
pub mod text;

pub use crate::browser::{Browser, HttpBrowser, Page, PageGuard, QueryTarget};
pub use crate::classify::{ErrorClassification, ErrorKind, FallbackStrategy};
pub use crate::content::{ArticleContent, ArticleMetadata, ExtractionMethod};
pub use crate::error::{FetchError, PageError};
pub use crate::options::{EngineBuilder, EngineOptions};
pub use crate::orchestrator::Engine;
pub use crate::prompt::generate_rating_prompt;
pub use crate::scoring::{quality_score, reliability_for_name, reliability_score, QualityInput};
pub use crate::site::{SelectorSpec, SiteProfile, SiteRegistry};
pub use crate::text::{clean as clean_html, estimate_reading_time};

#[cfg(feature = "chromium")]
pub use crate::browser::ChromiumBrowser;

/// Fetch and score one article with a default engine over the static HTTP backend.
pub async fn fetch_article_content(url: &str) -> Result<ArticleContent, FetchError> {
    let engine = Engine::builder()
        .build()
        .map_err(|err| FetchError::new(url, 1, err))?;
    engine.fetch(url).await
}

// ABOUTME: Engine drives one fetch end to end: profile lookup, page lifecycle, extraction and scoring.
// ABOUTME: Page failures are classified into FetchError; the page is closed on every exit path.

use std::sync::Arc;

use scraper::Html;
use tracing::instrument;
use url::Url;

use crate::browser::{Browser, Page, PageGuard};
use crate::content::{ArticleContent, ArticleMetadata, ExtractionMethod};
use crate::error::{FetchError, PageError};
use crate::extract::cascade::{ContentExtractor, ExtractionAttempt};
use crate::extract::fusion::{fuse, FusedMetadata, MetadataBag, MetadataSource, MetadataSources};
use crate::extract::{dates, readability, sources};
use crate::options::{EngineBuilder, EngineOptions};
use crate::scoring::{quality_score, reliability_score, QualityInput};
use crate::site::{SiteProfile, SiteRegistry};
use crate::text::{clean, TextStats};

/// Content shorter than this (in characters) triggers the fallbacks.
pub const MIN_CONTENT_CHARS: usize = 200;

/// Fetches pages and turns them into scored [`ArticleContent`].
///
/// Cheap to share behind an `Arc`; every fetch opens its own page.
pub struct Engine {
    opts: EngineOptions,
    registry: Arc<SiteRegistry>,
    browser: Arc<dyn Browser>,
}

/// Per-field cascade results for one page.
struct Cascade {
    title: ExtractionAttempt,
    content: ExtractionAttempt,
    author: ExtractionAttempt,
    published_date: ExtractionAttempt,
    modified_date: ExtractionAttempt,
    tags: ExtractionAttempt<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentOrigin {
    Selectors,
    Readability,
    ArticleBody,
    Missing,
}

impl Engine {
    /// Create a new EngineBuilder for configuring the engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Create an engine over `browser`. Uses the built-in site registry unless
    /// the options carry one.
    pub fn new(mut opts: EngineOptions, browser: Arc<dyn Browser>) -> Self {
        let registry = opts.registry.take().unwrap_or_else(SiteRegistry::builtin);
        Self {
            opts,
            registry: Arc::new(registry),
            browser,
        }
    }

    /// Name of the page backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.browser.name()
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn options(&self) -> &EngineOptions {
        &self.opts
    }

    /// Fetch and extract `url` as a first attempt.
    pub async fn fetch(&self, url: &str) -> Result<ArticleContent, FetchError> {
        self.fetch_attempt(url, 1).await
    }

    /// Fetch and extract `url`. `attempt` (1-based) only feeds the retry
    /// guidance in a returned error; the engine never retries by itself.
    #[instrument(skip(self), fields(backend = self.browser.name()))]
    pub async fn fetch_attempt(&self, url: &str, attempt: u32) -> Result<ArticleContent, FetchError> {
        let profile = self.registry.resolve(url);
        tracing::debug!(site = %profile.name, "resolved site profile");

        let page = match self.browser.new_page().await {
            Ok(page) => page,
            Err(err) => return Err(self.failure(url, attempt, err)),
        };
        let mut guard = PageGuard::new(page, url);
        let result = self.extract(&mut guard, url, profile).await;
        // Close failures are logged by the guard and never mask the result.
        let _ = guard.close().await;

        match result {
            Ok(article) => {
                tracing::info!(
                    url,
                    site = %article.site,
                    method = %article.extraction_method,
                    quality = article.quality_score,
                    "article extracted"
                );
                Ok(article)
            }
            Err(err) => Err(self.failure(url, attempt, err)),
        }
    }

    fn failure(&self, url: &str, attempt: u32, err: PageError) -> FetchError {
        let failure = FetchError::new(url, attempt, err);
        tracing::warn!(
            url,
            attempt,
            kind = %failure.kind(),
            retry = failure.should_retry(),
            error = %failure.source,
            "fetch failed"
        );
        failure
    }

    async fn extract(
        &self,
        page: &mut PageGuard,
        url: &str,
        profile: &SiteProfile,
    ) -> Result<ArticleContent, PageError> {
        let timeout = self.opts.navigation_timeout;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(result) => result?,
            Err(_) => return Err(PageError::Timeout(timeout)),
        }

        if profile.js_required {
            if let Err(err) = page.wait_for_scripts(profile.wait_time).await {
                tracing::debug!(error = %err, "waiting for scripts failed; extracting anyway");
            }
        }
        if profile.scroll_to_load {
            if let Err(err) = page.scroll_to_load().await {
                tracing::debug!(error = %err, "scroll to load failed; extracting anyway");
            }
        }

        let page_url = page.url().unwrap_or_else(|| url.to_string());
        let cascade = run_cascade(&**page, &page_url, profile).await;
        let html = page.html().await?;

        Ok(assemble(
            url,
            &page_url,
            profile,
            !self.registry.is_generic(profile),
            cascade,
            &html,
        ))
    }
}

async fn run_cascade(page: &dyn Page, url: &str, profile: &SiteProfile) -> Cascade {
    let selectors = &profile.selectors;
    let mut extractor = ContentExtractor::new(page, url);
    Cascade {
        title: extractor.extract_field("title", &selectors.title).await,
        content: extractor.extract_field("content", &selectors.content).await,
        author: extractor.extract_field("author", &selectors.author).await,
        published_date: extractor
            .extract_field("publishedDate", &selectors.published_date)
            .await,
        modified_date: extractor
            .extract_field("modifiedDate", &selectors.modified_date)
            .await,
        tags: extractor.extract_list("tags", &selectors.tags).await,
    }
}

/// Everything after the page HTML is in hand. Synchronous so parsed
/// documents never live across an await.
fn assemble(
    url: &str,
    page_url: &str,
    profile: &SiteProfile,
    site_specific: bool,
    cascade: Cascade,
    html: &str,
) -> ArticleContent {
    let (structured, meta) = {
        let doc = Html::parse_document(html);
        (sources::structured_data(&doc), sources::meta_tags(&doc))
    };

    let (fragment, origin) = choose_content(&cascade, html, structured.article_body.as_deref());
    let content = fragment.as_deref().map(clean).unwrap_or_default();
    let base = Url::parse(page_url).ok();
    let (images, code_blocks) = match fragment.as_deref() {
        Some(fragment) => (
            sources::images(fragment, base.as_ref()),
            sources::code_blocks(fragment),
        ),
        None => (Vec::new(), Vec::new()),
    };

    let dom = MetadataBag {
        title: cascade.title.value.clone(),
        author: cascade.author.value.clone(),
        published_date: cascade.published_date.value.clone(),
        modified_date: cascade.modified_date.value.clone(),
        tags: cascade.tags.value.clone().unwrap_or_default(),
        ..Default::default()
    };
    let fused = fuse(&MetadataSources {
        structured: Some(structured.metadata),
        meta: Some(meta),
        content: Some(dom),
    });

    let method = choose_method(&fused, origin, site_specific);
    let used_selectors = used_selectors(&cascade, &fused, origin);

    let stats = TextStats::of(&content);
    let has_text = !content.is_empty();
    let fields = fused.metadata;
    let metadata = ArticleMetadata {
        author: fields.author,
        published_date: fields.published_date.as_deref().map(dates::normalize_date),
        modified_date: fields.modified_date.as_deref().map(dates::normalize_date),
        reading_time: has_text.then(|| stats.minutes()),
        word_count: has_text.then(|| stats.word_count()),
        tags: fields.tags,
        description: fields.description,
        image: fields.image,
        images,
        code_blocks,
    };
    let title = fields.title.unwrap_or_default();

    let quality = quality_score(&QualityInput {
        title: Some(&title),
        content: Some(&content),
        metadata: Some(&metadata),
        method: Some(method),
    });
    let reliability = reliability_score(method, &used_selectors);

    ArticleContent {
        url: url.to_string(),
        title,
        content,
        metadata,
        extraction_method: method,
        quality_score: quality,
        reliability_score: reliability,
        site: profile.name.clone(),
        used_selectors,
    }
}

/// Selector content first; readability, then JSON-LD `articleBody`, when it
/// is missing or short. A fallback only replaces content it beats on length.
fn choose_content(
    cascade: &Cascade,
    html: &str,
    article_body: Option<&str>,
) -> (Option<String>, ContentOrigin) {
    let mut best = cascade.content.value.clone();
    let mut origin = if best.is_some() {
        ContentOrigin::Selectors
    } else {
        ContentOrigin::Missing
    };
    let mut best_len = text_len(best.as_deref());

    if best_len < MIN_CONTENT_CHARS {
        if let Some(candidate) = readability::extract_main_content(html) {
            let len = text_len(Some(&candidate));
            if len > best_len {
                tracing::debug!(chars = len, "using readability content");
                best = Some(candidate);
                best_len = len;
                origin = ContentOrigin::Readability;
            }
        }
    }

    if best_len < MIN_CONTENT_CHARS {
        if let Some(body) = article_body {
            let len = text_len(Some(body));
            if len > best_len {
                tracing::debug!(chars = len, "using JSON-LD articleBody");
                best = Some(body.to_string());
                origin = ContentOrigin::ArticleBody;
            }
        }
    }

    (best, origin)
}

fn text_len(fragment: Option<&str>) -> usize {
    fragment.map(|f| clean(f).chars().count()).unwrap_or(0)
}

fn choose_method(fused: &FusedMetadata, origin: ContentOrigin, site_specific: bool) -> ExtractionMethod {
    let dom_core_field = ["title", "author", "publishedDate"]
        .iter()
        .any(|field| fused.source_of(field) == Some(MetadataSource::Content));

    if fused.contributed(MetadataSource::Structured) || origin == ContentOrigin::ArticleBody {
        ExtractionMethod::StructuredData
    } else if site_specific && (origin == ContentOrigin::Selectors || dom_core_field) {
        ExtractionMethod::SiteSpecific
    } else if origin == ContentOrigin::Readability {
        ExtractionMethod::Readability
    } else if fused.contributed(MetadataSource::Meta) {
        ExtractionMethod::MetaTags
    } else {
        ExtractionMethod::Fallback
    }
}

/// Selectors (or source labels) behind the fields that made it into the article.
fn used_selectors(cascade: &Cascade, fused: &FusedMetadata, origin: ContentOrigin) -> Vec<String> {
    let mut used = Vec::new();
    let mut push = |label: String| {
        if !used.contains(&label) {
            used.push(label);
        }
    };

    let scalar = [
        ("title", &cascade.title),
        ("author", &cascade.author),
        ("publishedDate", &cascade.published_date),
        ("modifiedDate", &cascade.modified_date),
    ];
    for (field, attempt) in scalar {
        if fused.source_of(field) == Some(MetadataSource::Content) {
            if let Some(selector) = &attempt.used_selector {
                push(selector.clone());
            }
        }
    }
    if fused.source_of("tags") == Some(MetadataSource::Content) {
        if let Some(selector) = &cascade.tags.used_selector {
            push(selector.clone());
        }
    }

    match origin {
        ContentOrigin::Selectors => {
            if let Some(selector) = &cascade.content.used_selector {
                push(selector.clone());
            }
        }
        ContentOrigin::Readability => push("readability".to_string()),
        ContentOrigin::ArticleBody => push(MetadataSource::Structured.label().to_string()),
        ContentOrigin::Missing => {}
    }

    for source in [MetadataSource::Structured, MetadataSource::Meta] {
        if fused.contributed(source) {
            push(source.label().to_string());
        }
    }
    used
}

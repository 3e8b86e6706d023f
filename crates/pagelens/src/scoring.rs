// ABOUTME: Quality and reliability scores for extracted articles.
// ABOUTME: Quality weighs title, content, metadata and method; reliability reflects the method and selectors used.

//! Scoring.
//!
//! Quality is `achieved / attainable`. Title (25) and content (35) are
//! always attainable; metadata (20) only when metadata was offered and the
//! method bonus (20) only when a method is known.

use crate::content::{ArticleContent, ArticleMetadata, ExtractionMethod};

const TITLE_MAX: u32 = 25;
const CONTENT_MAX: u32 = 35;
const METADATA_MAX: u32 = 20;
const METHOD_MAX: u32 = 20;

/// Base reliability for method names the engine does not know.
pub const UNKNOWN_METHOD_RELIABILITY: f64 = 0.3;
const SELECTOR_BONUS: f64 = 0.05;
const SELECTOR_BONUS_CAP: f64 = 0.2;

/// What the quality score looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityInput<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub metadata: Option<&'a ArticleMetadata>,
    pub method: Option<ExtractionMethod>,
}

impl<'a> From<&'a ArticleContent> for QualityInput<'a> {
    fn from(article: &'a ArticleContent) -> Self {
        Self {
            title: Some(&article.title),
            content: Some(&article.content),
            metadata: Some(&article.metadata),
            method: Some(article.extraction_method),
        }
    }
}

/// Quality score in `[0, 1]`.
pub fn quality_score(input: &QualityInput<'_>) -> f64 {
    let mut achieved = title_points(input.title) + content_points(input.content);
    let mut attainable = TITLE_MAX + CONTENT_MAX;

    if let Some(metadata) = input.metadata.filter(|m| !m.is_empty()) {
        achieved += metadata_points(metadata);
        attainable += METADATA_MAX;
    }
    if let Some(method) = input.method {
        achieved += method_points(method);
        attainable += METHOD_MAX;
    }

    (f64::from(achieved) / f64::from(attainable)).clamp(0.0, 1.0)
}

fn title_points(title: Option<&str>) -> u32 {
    match title.map(|t| t.trim().chars().count()).unwrap_or(0) {
        0 => 0,
        10..=100 => TITLE_MAX,
        5..=9 => 15,
        _ => 5,
    }
}

fn content_points(content: Option<&str>) -> u32 {
    match content.map(|c| c.trim().chars().count()).unwrap_or(0) {
        n if n >= 2000 => CONTENT_MAX,
        n if n >= 1000 => 25,
        n if n >= 500 => 15,
        n if n >= 100 => 10,
        _ => 0,
    }
}

fn metadata_points(metadata: &ArticleMetadata) -> u32 {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
    let mut points = 0;
    if present(&metadata.author) {
        points += 5;
    }
    if present(&metadata.published_date) {
        points += 5;
    }
    if metadata.reading_time.is_some_and(|minutes| minutes > 0) {
        points += 5;
    }
    if !metadata.images.is_empty() || metadata.image.is_some() {
        points += 3;
    }
    if !metadata.code_blocks.is_empty() {
        points += 2;
    }
    points.min(METADATA_MAX)
}

fn method_points(method: ExtractionMethod) -> u32 {
    match method {
        ExtractionMethod::StructuredData => 20,
        ExtractionMethod::Readability => 18,
        ExtractionMethod::SiteSpecific => 15,
        ExtractionMethod::MetaTags => 10,
        ExtractionMethod::Fallback => 5,
    }
}

/// Base trust in each extraction method.
pub fn method_reliability(method: ExtractionMethod) -> f64 {
    match method {
        ExtractionMethod::StructuredData => 0.95,
        ExtractionMethod::Readability => 0.9,
        ExtractionMethod::SiteSpecific => 0.8,
        ExtractionMethod::MetaTags => 0.7,
        ExtractionMethod::Fallback => 0.4,
    }
}

/// Reliability in `[0, 1]`: the method's base plus 0.05 per consulted selector, bonus capped at 0.2.
pub fn reliability_score<S: AsRef<str>>(method: ExtractionMethod, used_selectors: &[S]) -> f64 {
    with_selector_bonus(method_reliability(method), used_selectors.len())
}

/// Reliability for a method given by name; unrecognised names start from 0.3.
pub fn reliability_for_name<S: AsRef<str>>(method: &str, used_selectors: &[S]) -> f64 {
    let base = method
        .parse::<ExtractionMethod>()
        .map(method_reliability)
        .unwrap_or(UNKNOWN_METHOD_RELIABILITY);
    with_selector_bonus(base, used_selectors.len())
}

fn with_selector_bonus(base: f64, selector_count: usize) -> f64 {
    let bonus = (SELECTOR_BONUS * selector_count as f64).min(SELECTOR_BONUS_CAP);
    (base + bonus).min(1.0)
}

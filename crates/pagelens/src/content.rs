// ABOUTME: ArticleContent, the engine's output value, with its metadata and extraction method.
// ABOUTME: Serializes to camelCase JSON; constructed once per fetch and immutable afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which source ultimately produced an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    StructuredData,
    SiteSpecific,
    Readability,
    MetaTags,
    Fallback,
}

impl ExtractionMethod {
    pub const ALL: [ExtractionMethod; 5] = [
        ExtractionMethod::StructuredData,
        ExtractionMethod::SiteSpecific,
        ExtractionMethod::Readability,
        ExtractionMethod::MetaTags,
        ExtractionMethod::Fallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::StructuredData => "structured-data",
            ExtractionMethod::SiteSpecific => "site-specific",
            ExtractionMethod::Readability => "readability",
            ExtractionMethod::MetaTags => "meta-tags",
            ExtractionMethod::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExtractionMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| format!("unknown extraction method: {s}"))
    }
}

/// Article metadata after fusion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// RFC3339 when the source date was parseable, otherwise as found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,
    /// Minutes, at least 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_blocks: Vec<String>,
}

impl ArticleMetadata {
    /// Returns true if no field carries a value.
    pub fn is_empty(&self) -> bool {
        self == &ArticleMetadata::default()
    }
}

/// Extracted article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    pub url: String,
    pub title: String,
    /// Plain text, no markup.
    pub content: String,
    pub metadata: ArticleMetadata,
    pub extraction_method: ExtractionMethod,
    pub quality_score: f64,
    pub reliability_score: f64,
    /// Name of the site profile used.
    pub site: String,
    /// Selector (or source) that produced each committed field.
    #[serde(default)]
    pub used_selectors: Vec<String>,
}

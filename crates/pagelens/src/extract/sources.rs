// ABOUTME: Independent metadata sources read from page HTML: JSON-LD structured data and meta tags.
// ABOUTME: Also harvests image URLs and code blocks from the winning content fragment.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::extract::fusion::MetadataBag;

const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "BlogPosting",
    "TechArticle",
    "ScholarlyArticle",
    "Report",
    "SocialMediaPosting",
];

const MAX_IMAGES: usize = 20;

static LD_JSON: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse("script[type='application/ld+json']").ok());
static META: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("meta").ok());
static IMG: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("img").ok());
static PRE: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("pre").ok());

/// What the page's JSON-LD says about the article.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredData {
    pub metadata: MetadataBag,
    /// Full text body, when the publisher embeds it.
    pub article_body: Option<String>,
}

/// Read the first article-typed JSON-LD object in the document.
pub fn structured_data(doc: &Html) -> StructuredData {
    let Some(selector) = LD_JSON.as_ref() else {
        return StructuredData::default();
    };
    for script in doc.select(selector) {
        let text = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(text.trim()) else {
            tracing::debug!("skipping malformed JSON-LD block");
            continue;
        };
        if let Some(article) = find_article(&value) {
            return read_article(article);
        }
    }
    StructuredData::default()
}

fn find_article(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if map.get("@type").is_some_and(is_article_type) {
                return Some(value);
            }
            ["@graph", "mainEntity", "mainEntityOfPage"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(find_article)
        }
        Value::Array(items) => items.iter().find_map(find_article),
        _ => None,
    }
}

fn is_article_type(value: &Value) -> bool {
    match value {
        Value::String(s) => ARTICLE_TYPES.iter().any(|t| s.eq_ignore_ascii_case(t)),
        Value::Array(items) => items.iter().any(is_article_type),
        _ => false,
    }
}

fn read_article(article: &Value) -> StructuredData {
    let text = |key: &str| article.get(key).and_then(as_text);
    let metadata = MetadataBag {
        title: text("headline").or_else(|| text("name")),
        description: text("description"),
        author: article.get("author").and_then(person_names),
        published_date: text("datePublished"),
        modified_date: text("dateModified"),
        image: article.get("image").and_then(image_url),
        tags: article.get("keywords").map(keywords).unwrap_or_default(),
    };
    let article_body = match article.get("articleBody") {
        Some(Value::Array(parts)) => {
            let joined = parts
                .iter()
                .filter_map(as_text)
                .collect::<Vec<_>>()
                .join("\n\n");
            Some(joined).filter(|s| !s.is_empty())
        }
        Some(value) => as_text(value),
        None => None,
    };
    StructuredData {
        metadata,
        article_body,
    }
}

fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Author may be a string, a Person object, or a list of either.
fn person_names(value: &Value) -> Option<String> {
    let names: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(person_names).collect(),
        Value::Object(map) => map.get("name").and_then(as_text).into_iter().collect(),
        other => as_text(other).into_iter().collect(),
    };
    Some(names.join(", ")).filter(|s| !s.is_empty())
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(image_url),
        Value::Object(map) => map.get("url").and_then(as_text),
        other => as_text(other),
    }
}

fn keywords(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_text).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Read Open Graph, Twitter card and standard meta tags.
pub fn meta_tags(doc: &Html) -> MetadataBag {
    let Some(selector) = META.as_ref() else {
        return MetadataBag::default();
    };
    let mut pairs: Vec<(String, String)> = Vec::new();
    for el in doc.select(selector) {
        let attrs = el.value();
        let key = attrs
            .attr("property")
            .or_else(|| attrs.attr("name"))
            .or_else(|| attrs.attr("itemprop"));
        if let (Some(key), Some(content)) = (key, attrs.attr("content")) {
            let content = content.trim();
            if !content.is_empty() {
                pairs.push((key.trim().to_ascii_lowercase(), content.to_string()));
            }
        }
    }

    let first = |keys: &[&str]| {
        keys.iter().find_map(|key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    };

    let author = first(&["author", "article:author", "twitter:creator"])
        .filter(|a| !a.starts_with("http://") && !a.starts_with("https://"));
    let mut tags: Vec<String> = pairs
        .iter()
        .filter(|(k, _)| k == "article:tag")
        .map(|(_, v)| v.clone())
        .collect();
    if tags.is_empty() {
        if let Some(keywords) = first(&["keywords"]) {
            tags = keywords
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    MetadataBag {
        title: first(&["og:title", "twitter:title"]),
        description: first(&["og:description", "description", "twitter:description"]),
        author,
        published_date: first(&["article:published_time", "datepublished", "date"]),
        modified_date: first(&["article:modified_time", "og:updated_time", "datemodified"]),
        image: first(&["og:image", "og:image:url", "twitter:image"]),
        tags,
    }
}

/// Absolute image URLs in a content fragment, in document order, deduplicated.
pub fn images(fragment: &str, base: Option<&Url>) -> Vec<String> {
    let Some(selector) = IMG.as_ref() else {
        return Vec::new();
    };
    let doc = Html::parse_fragment(fragment);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for img in doc.select(selector) {
        let attrs = img.value();
        let Some(src) = ["src", "data-src", "data-original"]
            .iter()
            .find_map(|name| attrs.attr(name))
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.starts_with("data:"))
        else {
            continue;
        };
        let resolved = match base {
            Some(base) => match base.join(src) {
                Ok(url) => url.to_string(),
                Err(_) => continue,
            },
            None => src.to_string(),
        };
        if seen.insert(resolved.clone()) {
            out.push(resolved);
        }
        if out.len() == MAX_IMAGES {
            break;
        }
    }
    out
}

/// Text of each `<pre>` block in a content fragment.
pub fn code_blocks(fragment: &str) -> Vec<String> {
    let Some(selector) = PRE.as_ref() else {
        return Vec::new();
    };
    let doc = Html::parse_fragment(fragment);
    doc.select(selector)
        .map(|pre| pre.text().collect::<String>().trim().to_string())
        .filter(|code| !code.is_empty())
        .collect()
}

// ABOUTME: Cascading selector extraction: tries a field's selectors in order until one yields a value.
// ABOUTME: Query results are memoised per fetch; a selector that errors counts as a miss.

use std::collections::HashMap;

use crate::browser::{Page, QueryTarget};
use crate::site::SelectorSpec;
use crate::text::clean;

/// Outcome of running one field's selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionAttempt<T = String> {
    pub field: &'static str,
    pub value: Option<T>,
    /// Display form of the selector that produced `value`.
    pub used_selector: Option<String>,
    /// Index of that selector in the list; 0 is the most specific.
    pub fallback_level: Option<usize>,
    /// Display forms of every selector consulted, in order.
    pub selectors_tried: Vec<String>,
}

impl<T> ExtractionAttempt<T> {
    fn miss(field: &'static str, selectors_tried: Vec<String>) -> Self {
        Self {
            field,
            value: None,
            used_selector: None,
            fallback_level: None,
            selectors_tried,
        }
    }

    fn hit(field: &'static str, value: T, level: usize, selectors_tried: Vec<String>) -> Self {
        Self {
            field,
            value: Some(value),
            used_selector: selectors_tried.last().cloned(),
            fallback_level: Some(level),
            selectors_tried,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    url: String,
    selector: String,
    target: QueryTarget,
    all: bool,
}

/// Runs selector cascades against one page for one fetch.
pub struct ContentExtractor<'p> {
    page: &'p dyn Page,
    url: String,
    cache: HashMap<CacheKey, Vec<String>>,
}

impl<'p> ContentExtractor<'p> {
    pub fn new(page: &'p dyn Page, url: impl Into<String>) -> Self {
        Self {
            page,
            url: url.into(),
            cache: HashMap::new(),
        }
    }

    /// First non-empty value for `field` across `specs`.
    ///
    /// The `content` field reads inner HTML and counts as empty when it holds
    /// no text; other plain CSS selectors read element text.
    pub async fn extract_field(
        &mut self,
        field: &'static str,
        specs: &[SelectorSpec],
    ) -> ExtractionAttempt {
        let mut tried = Vec::with_capacity(specs.len());
        for (level, spec) in specs.iter().enumerate() {
            tried.push(spec.to_string());
            let target = target_for(field, spec);
            let (css, _) = spec.parts();
            let values = self.run(css, &target, false).await;
            let value = values
                .into_iter()
                .next()
                .map(|v| v.trim().to_string())
                .filter(|v| has_content(v, &target));
            match value {
                Some(value) => {
                    tracing::debug!(field, selector = %spec, level, "selector matched");
                    return ExtractionAttempt::hit(field, value, level, tried);
                }
                None => tracing::debug!(field, selector = %spec, "selector missed"),
            }
        }
        tracing::debug!(field, tried = tried.len(), "no selector matched");
        ExtractionAttempt::miss(field, tried)
    }

    /// Every non-empty value from the first selector in `specs` that yields any.
    pub async fn extract_list(
        &mut self,
        field: &'static str,
        specs: &[SelectorSpec],
    ) -> ExtractionAttempt<Vec<String>> {
        let mut tried = Vec::with_capacity(specs.len());
        for (level, spec) in specs.iter().enumerate() {
            tried.push(spec.to_string());
            let target = target_for(field, spec);
            let (css, _) = spec.parts();
            let values: Vec<String> = self
                .run(css, &target, true)
                .await
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            if !values.is_empty() {
                tracing::debug!(field, selector = %spec, level, count = values.len(), "selector matched");
                return ExtractionAttempt::hit(field, values, level, tried);
            }
            tracing::debug!(field, selector = %spec, "selector missed");
        }
        ExtractionAttempt::miss(field, tried)
    }

    async fn run(&mut self, css: &str, target: &QueryTarget, all: bool) -> Vec<String> {
        let key = CacheKey {
            url: self.url.clone(),
            selector: css.to_string(),
            target: target.clone(),
            all,
        };
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }

        let page = self.page;
        let result = if all {
            page.query_all(css, target).await
        } else {
            page.query(css, target).await.map(|v| v.into_iter().collect())
        };
        let values = result.unwrap_or_else(|err| {
            tracing::debug!(selector = css, error = %err, "selector query failed");
            Vec::new()
        });
        self.cache.insert(key, values.clone());
        values
    }
}

fn target_for(field: &str, spec: &SelectorSpec) -> QueryTarget {
    match spec.parts() {
        (_, Some(attr)) => QueryTarget::attribute(attr),
        (_, None) if field == "content" => QueryTarget::InnerHtml,
        (_, None) => QueryTarget::Text,
    }
}

fn has_content(value: &str, target: &QueryTarget) -> bool {
    match target {
        QueryTarget::InnerHtml => !clean(value).is_empty(),
        _ => !value.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::ScriptedPage;
    use pretty_assertions::assert_eq;

    fn specs(selectors: &[&str]) -> Vec<SelectorSpec> {
        selectors.iter().map(|s| SelectorSpec::css(*s)).collect()
    }

    #[tokio::test]
    async fn falls_through_empty_selectors() {
        let page = ScriptedPage::new()
            .script(".main-title", "")
            .script("h1.title", "  ")
            .script("h1", "Main Article Title");
        let mut extractor = ContentExtractor::new(&page, "https://example.com/a");
        let attempt = extractor
            .extract_field("title", &specs(&[".main-title", "h1.title", "h1"]))
            .await;
        assert_eq!(
            attempt,
            ExtractionAttempt {
                field: "title",
                value: Some("Main Article Title".to_string()),
                used_selector: Some("h1".to_string()),
                fallback_level: Some(2),
                selectors_tried: vec![
                    ".main-title".to_string(),
                    "h1.title".to_string(),
                    "h1".to_string()
                ],
            }
        );
    }

    #[tokio::test]
    async fn throwing_selector_is_a_miss() {
        let page = ScriptedPage::new()
            .throwing(".broken")
            .script(".author", "Alice");
        let mut extractor = ContentExtractor::new(&page, "https://example.com/a");
        let attempt = extractor
            .extract_field("author", &specs(&[".broken", ".author"]))
            .await;
        assert_eq!(attempt.value.as_deref(), Some("Alice"));
        assert_eq!(attempt.fallback_level, Some(1));
    }

    #[tokio::test]
    async fn all_miss_returns_empty_attempt() {
        let page = ScriptedPage::new().with_html("<html><body><p>nothing</p></body></html>");
        let mut extractor = ContentExtractor::new(&page, "https://example.com/a");
        let attempt = extractor
            .extract_field("title", &specs(&["h1", ".title"]))
            .await;
        assert!(!attempt.is_hit());
        assert_eq!(attempt.used_selector, None);
        assert_eq!(attempt.fallback_level, None);
        assert_eq!(attempt.selectors_tried, vec!["h1".to_string(), ".title".to_string()]);
    }

    #[tokio::test]
    async fn content_reads_inner_html_and_attrs_read_attributes() {
        let page = ScriptedPage::new().with_html(
            r#"<html><head><meta property="og:title" content="OG"></head>
            <body><article><p>Body <b>text</b></p></article><div class="empty"><img src="x.png"></div></body></html>"#,
        );
        let mut extractor = ContentExtractor::new(&page, "https://example.com/a");

        let content = extractor
            .extract_field("content", &specs(&[".empty", "article"]))
            .await;
        assert_eq!(content.value.as_deref(), Some("<p>Body <b>text</b></p>"));
        assert_eq!(content.fallback_level, Some(1));

        let title = extractor
            .extract_field("title", &[SelectorSpec::attr("meta[property='og:title']", "content")])
            .await;
        assert_eq!(title.value.as_deref(), Some("OG"));
        assert_eq!(
            title.used_selector.as_deref(),
            Some("meta[property='og:title']@content")
        );
    }

    #[tokio::test]
    async fn lists_collect_every_match() {
        let page = ScriptedPage::new().with_html(
            r#"<div class="tags"><a>rust</a><a> </a><a>async</a></div>"#,
        );
        let mut extractor = ContentExtractor::new(&page, "https://example.com/a");
        let tags = extractor
            .extract_list("tags", &specs(&["a[rel='tag']", ".tags a"]))
            .await;
        assert_eq!(tags.value, Some(vec!["rust".to_string(), "async".to_string()]));
        assert_eq!(tags.used_selector.as_deref(), Some(".tags a"));
    }

    #[tokio::test]
    async fn repeated_queries_hit_the_cache() {
        let page = ScriptedPage::new().script("h1", "Cached");
        let mut extractor = ContentExtractor::new(&page, "https://example.com/a");
        extractor.extract_field("title", &specs(&["h1"])).await;
        extractor.extract_field("title", &specs(&["h1"])).await;
        assert_eq!(page.query_count("h1"), 1);
    }

    #[tokio::test]
    async fn invalid_selector_is_a_miss() {
        let page = ScriptedPage::new().with_html("<h1>Title</h1>");
        let mut extractor = ContentExtractor::new(&page, "https://example.com/a");
        let attempt = extractor
            .extract_field("title", &specs(&["h1[", "h1"]))
            .await;
        assert_eq!(attempt.value.as_deref(), Some("Title"));
        assert_eq!(attempt.fallback_level, Some(1));
    }
}

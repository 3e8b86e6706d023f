// ABOUTME: Site profile data model: ordered selector lists per field plus navigation hints.
// ABOUTME: Profiles deserialize from the embedded JSON registry and are immutable once built.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to read a value from the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorSpec {
    /// A CSS selector whose element text (or inner HTML for content) is read, e.g. "h1.title".
    Css(String),
    /// A CSS selector with attribute extraction, e.g. ["meta[property='og:title']", "content"].
    CssAttr(Vec<String>),
}

impl SelectorSpec {
    pub fn css(selector: impl Into<String>) -> Self {
        SelectorSpec::Css(selector.into())
    }

    pub fn attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        SelectorSpec::CssAttr(vec![selector.into(), attr.into()])
    }

    /// Splits the spec into a CSS selector and an optional attribute name.
    pub fn parts(&self) -> (&str, Option<&str>) {
        match self {
            SelectorSpec::Css(css) => (css.as_str(), None),
            SelectorSpec::CssAttr(parts) => match parts.as_slice() {
                [css, attr, ..] => (css.as_str(), Some(attr.as_str())),
                [css] => (css.as_str(), None),
                [] => ("", None),
            },
        }
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parts() {
            (css, Some(attr)) => write!(f, "{}@{}", css, attr),
            (css, None) => write!(f, "{}", css),
        }
    }
}

/// Ordered selector lists per field, most specific first.
///
/// Lists left empty in the source data are filled from the generic profile
/// when the registry is built, so every list of a registered profile is
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSet {
    #[serde(default)]
    pub title: Vec<SelectorSpec>,
    #[serde(default)]
    pub content: Vec<SelectorSpec>,
    #[serde(default)]
    pub author: Vec<SelectorSpec>,
    #[serde(default)]
    pub published_date: Vec<SelectorSpec>,
    #[serde(default)]
    pub modified_date: Vec<SelectorSpec>,
    #[serde(default)]
    pub tags: Vec<SelectorSpec>,
}

impl SelectorSet {
    /// Field name and selector list pairs, in extraction order.
    pub fn fields(&self) -> [(&'static str, &[SelectorSpec]); 6] {
        [
            ("title", self.title.as_slice()),
            ("content", self.content.as_slice()),
            ("author", self.author.as_slice()),
            ("publishedDate", self.published_date.as_slice()),
            ("modifiedDate", self.modified_date.as_slice()),
            ("tags", self.tags.as_slice()),
        ]
    }

    /// Fill every empty list from `defaults`.
    pub(crate) fn fill_from(&mut self, defaults: &SelectorSet) {
        let pairs = [
            (&mut self.title, &defaults.title),
            (&mut self.content, &defaults.content),
            (&mut self.author, &defaults.author),
            (&mut self.published_date, &defaults.published_date),
            (&mut self.modified_date, &defaults.modified_date),
            (&mut self.tags, &defaults.tags),
        ];
        for (list, fallback) in pairs {
            if list.is_empty() {
                list.clone_from(fallback);
            }
        }
    }
}

/// Per-site extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProfile {
    /// Short identifier, e.g. "qiita".
    pub name: String,
    /// Hostnames this profile applies to; subdomains match too.
    #[serde(default)]
    pub domains: Vec<String>,
    pub selectors: SelectorSet,
    /// How long script-driven content may take to appear after navigation.
    #[serde(rename = "waitTimeMs", with = "crate::duration_ms", default = "default_wait")]
    pub wait_time: Duration,
    #[serde(default)]
    pub scroll_to_load: bool,
    #[serde(default)]
    pub js_required: bool,
}

fn default_wait() -> Duration {
    Duration::from_millis(1000)
}

impl SiteProfile {
    /// The profile used for hosts no registered profile claims.
    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            domains: Vec::new(),
            selectors: SelectorSet {
                title: vec![
                    SelectorSpec::css("h1"),
                    SelectorSpec::attr("meta[property='og:title']", "content"),
                    SelectorSpec::css("title"),
                ],
                content: vec![SelectorSpec::css("article, .content, .post-content, main")],
                author: vec![
                    SelectorSpec::css(".author, .byline"),
                    SelectorSpec::attr("meta[name='author']", "content"),
                ],
                published_date: vec![
                    SelectorSpec::attr("time[datetime]", "datetime"),
                    SelectorSpec::css("time"),
                    SelectorSpec::css(".date, .published"),
                ],
                modified_date: vec![
                    SelectorSpec::attr("meta[property='article:modified_time']", "content"),
                    SelectorSpec::css(".updated, .modified"),
                ],
                tags: vec![
                    SelectorSpec::css("a[rel='tag']"),
                    SelectorSpec::css(".tags a, .tag"),
                ],
            },
            wait_time: Duration::from_millis(1000),
            scroll_to_load: false,
            js_required: false,
        }
    }

    /// Length of the longest profile domain that `host` equals or is a subdomain of.
    pub fn match_len(&self, host: &str) -> Option<usize> {
        self.domains
            .iter()
            .filter(|domain| {
                host == domain.as_str()
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
            .map(String::len)
            .max()
    }
}

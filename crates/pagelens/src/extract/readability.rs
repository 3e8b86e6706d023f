// ABOUTME: Readability-style fallback that finds the main content container by scoring paragraphs.
// ABOUTME: Scores p/pre nodes into their ancestors, picks the best candidate, merges qualifying siblings.

//! Readability fallback.
//!
//! Used when no profile selector yields usable content. Paragraph scores
//! (punctuation, length) flow to the parent in full and the grandparent at
//! half; class/id hints adjust each container once; link-heavy candidates
//! are discounted. Lengths are counted in characters so CJK text scores as
//! well as Latin text.

use std::collections::HashMap;

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static POSITIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|main|page|post|story|text|blog|markdown|znc").unwrap()
});
static NEGATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)ad-|advert|banner|breadcrumb|combx|comment|related|footer|footnote|header|menu|meta|nav|outbrain|pager|popup|promo|share|sidebar|social|sponsor|tags|widget").unwrap()
});
static UNLIKELY_TAGS: &[&str] = &["script", "style", "noscript", "nav", "footer", "aside", "form", "header"];
static NON_CANDIDATE_TAGS: &[&str] = &["br", "b", "i", "label", "hr", "img", "a", "span", "code"];

static PARAGRAPHS: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("p, pre").ok());
static LINKS: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("a").ok());
static BODY: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("body").ok());

/// Minimum paragraph length considered at all.
const MIN_PARAGRAPH_CHARS: usize = 25;

type NodeScores = HashMap<NodeId, f64>;

/// HTML of the most likely main content container, if any paragraph scored.
pub fn extract_main_content(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let scores = score_paragraphs(&doc);
    let (candidate, top_score) = top_candidate(&doc, &scores)?;
    tracing::debug!(
        tag = candidate.value().name(),
        score = top_score,
        "readability candidate"
    );
    Some(merge_siblings(candidate, top_score, &scores))
}

fn score_paragraphs(doc: &Html) -> NodeScores {
    let mut scores = NodeScores::new();
    let Some(paragraphs) = PARAGRAPHS.as_ref() else {
        return scores;
    };

    for paragraph in doc.select(paragraphs) {
        if in_unlikely_subtree(&paragraph) {
            continue;
        }
        let text = normalize_spaces(&paragraph.text().collect::<String>());
        let len = text.chars().count();
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let score = 1.0 + comma_count(&text) as f64 + (len / 100).min(3) as f64;

        let Some(parent) = paragraph.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        add_score(&parent, score, &mut scores);
        if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
            add_score(&grandparent, score / 2.0, &mut scores);
        }
    }
    scores
}

fn add_score(element: &ElementRef, amount: f64, scores: &mut NodeScores) {
    let entry = scores
        .entry(element.id())
        .or_insert_with(|| initial_score(element));
    *entry += amount;
}

fn initial_score(element: &ElementRef) -> f64 {
    let base = match element.value().name() {
        "article" | "main" => 10.0,
        "div" | "section" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    base + class_weight(element)
}

/// Class and id hints: +25 for content-like names, -25 for chrome-like names.
fn class_weight(element: &ElementRef) -> f64 {
    let mut weight = 0.0;
    for value in [element.value().attr("class"), element.value().attr("id")]
        .into_iter()
        .flatten()
    {
        if NEGATIVE_RE.is_match(value) {
            weight -= 25.0;
        }
        if POSITIVE_RE.is_match(value) {
            weight += 25.0;
        }
    }
    weight
}

fn top_candidate<'a>(doc: &'a Html, scores: &NodeScores) -> Option<(ElementRef<'a>, f64)> {
    // Document order, so ties go to the earlier container.
    let mut best: Option<(ElementRef<'a>, f64)> = None;
    for node in doc.tree.nodes() {
        let Some(score) = scores.get(&node.id()) else {
            continue;
        };
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let name = element.value().name();
        if NON_CANDIDATE_TAGS.contains(&name) || name == "body" || name == "html" {
            continue;
        }
        let adjusted = score * (1.0 - link_density(&element));
        let top = best.as_ref().map_or(0.0, |(_, top)| *top);
        if adjusted > top {
            best = Some((element, adjusted));
        }
    }

    best.or_else(|| {
        let body = doc.select(BODY.as_ref()?).next()?;
        let has_text = !normalize_spaces(&body.text().collect::<String>()).is_empty();
        has_text.then_some((body, 0.0))
    })
}

/// Wrap the candidate together with siblings that look like part of the same article.
fn merge_siblings(candidate: ElementRef, top_score: f64, scores: &NodeScores) -> String {
    let Some(parent) = candidate.parent() else {
        return candidate.inner_html();
    };
    let threshold = (top_score * 0.2).max(10.0);

    let mut included = Vec::new();
    for sibling in parent.children().filter_map(ElementRef::wrap) {
        if sibling.id() == candidate.id() {
            included.push(sibling);
            continue;
        }
        if UNLIKELY_TAGS.contains(&sibling.value().name()) {
            continue;
        }
        let density = link_density(&sibling);
        if density >= 0.5 {
            continue;
        }
        let score = scores.get(&sibling.id()).copied().unwrap_or(0.0);
        let text = normalize_spaces(&sibling.text().collect::<String>());
        let len = text.chars().count();
        let long_paragraph = sibling.value().name() == "p" && len > 80 && density < 0.25;
        if score >= threshold || long_paragraph {
            included.push(sibling);
        }
    }

    if included.len() <= 1 {
        return candidate.inner_html();
    }
    included.iter().map(|el| el.html()).collect::<Vec<_>>().join("\n")
}

fn in_unlikely_subtree(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            UNLIKELY_TAGS.contains(&ancestor.value().name())
                || ancestor
                    .value()
                    .attr("class")
                    .is_some_and(|class| NEGATIVE_RE.is_match(class) && !POSITIVE_RE.is_match(class))
        })
}

/// Ratio of link text to all text, by characters.
fn link_density(element: &ElementRef) -> f64 {
    let total = element.text().map(|t| t.chars().count()).sum::<usize>();
    if total == 0 {
        return 0.0;
    }
    let Some(links) = LINKS.as_ref() else {
        return 0.0;
    };
    let linked: usize = element
        .select(links)
        .map(|a| a.text().map(|t| t.chars().count()).sum::<usize>())
        .sum();
    linked as f64 / total as f64
}

fn comma_count(text: &str) -> usize {
    text.chars().filter(|c| matches!(c, ',' | '、' | '，')).count()
}

fn normalize_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ABOUTME: Merges metadata from structured data, meta tags and the DOM with a fixed source priority.
// ABOUTME: Records which source supplied each field so callers can tell which sources contributed.

use std::collections::BTreeMap;
use std::fmt;

/// One source's view of the article metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBag {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub modified_date: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<String>,
}

/// Where a metadata value came from, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataSource {
    /// JSON-LD embedded in the page.
    Structured,
    /// Open Graph, Twitter card and standard meta tags.
    Meta,
    /// Selector extraction over the rendered DOM.
    Content,
}

impl MetadataSource {
    /// Label recorded in an article's used-selector provenance.
    pub fn label(&self) -> &'static str {
        match self {
            MetadataSource::Structured => "json-ld",
            MetadataSource::Meta => "meta",
            MetadataSource::Content => "dom",
        }
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Up to three independently extracted bags.
#[derive(Debug, Clone, Default)]
pub struct MetadataSources {
    pub structured: Option<MetadataBag>,
    pub meta: Option<MetadataBag>,
    pub content: Option<MetadataBag>,
}

/// Fused metadata plus per-field provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FusedMetadata {
    pub metadata: MetadataBag,
    pub provenance: BTreeMap<&'static str, MetadataSource>,
}

impl FusedMetadata {
    /// Source that supplied `field`, if any did.
    pub fn source_of(&self, field: &str) -> Option<MetadataSource> {
        self.provenance.get(field).copied()
    }

    /// Returns true if `source` supplied at least one field.
    pub fn contributed(&self, source: MetadataSource) -> bool {
        self.provenance.values().any(|s| *s == source)
    }
}

/// Merge per field: structured data, then meta tags, then DOM; first non-empty value wins.
pub fn fuse(sources: &MetadataSources) -> FusedMetadata {
    let ranked: Vec<(MetadataSource, &MetadataBag)> = [
        (MetadataSource::Structured, sources.structured.as_ref()),
        (MetadataSource::Meta, sources.meta.as_ref()),
        (MetadataSource::Content, sources.content.as_ref()),
    ]
    .into_iter()
    .filter_map(|(source, bag)| bag.map(|bag| (source, bag)))
    .collect();

    let mut fused = FusedMetadata::default();
    let mut pick = |field: &'static str, get: fn(&MetadataBag) -> &Option<String>| {
        let winner = ranked.iter().find_map(|(source, bag)| {
            get(bag)
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (*source, v.to_string()))
        });
        winner.map(|(source, value)| {
            fused.provenance.insert(field, source);
            value
        })
    };

    let title = pick("title", |b| &b.title);
    let description = pick("description", |b| &b.description);
    let author = pick("author", |b| &b.author);
    let published_date = pick("publishedDate", |b| &b.published_date);
    let modified_date = pick("modifiedDate", |b| &b.modified_date);
    let image = pick("image", |b| &b.image);

    let tags = ranked.iter().find_map(|(source, bag)| {
        let tags: Vec<String> = bag
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        (!tags.is_empty()).then_some((*source, tags))
    });
    let tags = match tags {
        Some((source, tags)) => {
            fused.provenance.insert("tags", source);
            dedupe(tags)
        }
        None => Vec::new(),
    };

    fused.metadata = MetadataBag {
        title,
        description,
        author,
        published_date,
        modified_date,
        image,
        tags,
    };
    fused
}

fn dedupe(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bag(title: &str) -> MetadataBag {
        MetadataBag {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn structured_wins_conflicts() {
        let fused = fuse(&MetadataSources {
            structured: Some(bag("From JSON-LD")),
            meta: Some(bag("From og:title")),
            content: Some(bag("From h1")),
        });
        assert_eq!(fused.metadata.title.as_deref(), Some("From JSON-LD"));
        assert_eq!(fused.source_of("title"), Some(MetadataSource::Structured));
    }

    #[test]
    fn content_only_field_survives() {
        let fused = fuse(&MetadataSources {
            structured: Some(bag("Title")),
            meta: Some(MetadataBag::default()),
            content: Some(MetadataBag {
                author: Some("Only In DOM".into()),
                ..Default::default()
            }),
        });
        assert_eq!(fused.metadata.title.as_deref(), Some("Title"));
        assert_eq!(fused.metadata.author.as_deref(), Some("Only In DOM"));
        assert_eq!(fused.source_of("author"), Some(MetadataSource::Content));
        assert!(fused.contributed(MetadataSource::Structured));
        assert!(fused.contributed(MetadataSource::Content));
        assert!(!fused.contributed(MetadataSource::Meta));
    }

    #[test]
    fn blank_values_do_not_win() {
        let fused = fuse(&MetadataSources {
            structured: Some(bag("   ")),
            meta: Some(bag(" Meta Title ")),
            content: None,
        });
        assert_eq!(fused.metadata.title.as_deref(), Some("Meta Title"));
        assert_eq!(fused.source_of("title"), Some(MetadataSource::Meta));
    }

    #[test]
    fn tags_come_from_one_source() {
        let fused = fuse(&MetadataSources {
            structured: Some(MetadataBag::default()),
            meta: Some(MetadataBag {
                tags: vec!["Rust".into(), "rust".into(), " ".into(), "CLI".into()],
                ..Default::default()
            }),
            content: Some(MetadataBag {
                tags: vec!["dom-tag".into()],
                ..Default::default()
            }),
        });
        assert_eq!(fused.metadata.tags, vec!["Rust".to_string(), "CLI".to_string()]);
        assert_eq!(fused.source_of("tags"), Some(MetadataSource::Meta));
    }

    #[test]
    fn no_sources_is_empty() {
        let fused = fuse(&MetadataSources::default());
        assert_eq!(fused, FusedMetadata::default());
    }
}

// ABOUTME: Builds the text prompt handed to the downstream rating consumer.
// ABOUTME: Embeds extracted article details when available, otherwise asks the consumer to read the URL itself.

use crate::content::ArticleContent;

/// Longest content preview embedded in a prompt, in characters.
pub const PREVIEW_CHARS: usize = 200;

const CRITERIA: &str = "\
Rate the article on each criterion from 1 (poor) to 10 (excellent):
- Practicality: can a reader apply it directly?
- Technical depth: how thoroughly is the subject treated?
- Clarity: how easy is it to follow?
- Originality: does it offer new information or perspective?
- Importance: how much does it matter to practitioners in the field?

Reply with a score and a one-sentence reason for each criterion, then an overall score and a short summary.";

/// Prompt text for rating the article at `url`.
///
/// With `None` (extraction failed or was skipped) the consumer is told to open
/// the URL and judge the page itself.
pub fn generate_rating_prompt(content: Option<&ArticleContent>, url: &str) -> String {
    match content {
        Some(article) => with_content(article, url),
        None => format!(
            "The article content could not be extracted automatically.\n\
             Please visit the URL below, read the article, and evaluate it from the page itself.\n\n\
             URL: {url}\n\n{CRITERIA}"
        ),
    }
}

fn with_content(article: &ArticleContent, url: &str) -> String {
    let meta = &article.metadata;
    let or_unknown = |value: Option<&str>| match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "unknown".to_string(),
    };
    let title = match article.title.trim() {
        "" => "(untitled)",
        title => title,
    };
    let reading_time = meta
        .reading_time
        .map(|minutes| format!("{minutes} min"))
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "Please rate the following article.\n\n\
         Title: {title}\n\
         Author: {author}\n\
         Published: {published}\n\
         Reading time: {reading_time}\n\
         URL: {url}\n\n\
         Content preview:\n{preview}\n\n{CRITERIA}",
        author = or_unknown(meta.author.as_deref()),
        published = or_unknown(meta.published_date.as_deref()),
        preview = preview(&article.content),
    )
}

/// First [`PREVIEW_CHARS`] characters, with `...` appended when cut.
fn preview(content: &str) -> String {
    let content = content.trim();
    let mut chars = content.char_indices();
    match chars.nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

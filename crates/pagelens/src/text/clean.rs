// ABOUTME: HTML to plain text cleaning for extracted article fragments.
// ABOUTME: Drops script/style/comments, turns block tags into line breaks, decodes entities, collapses whitespace.

use once_cell::sync::Lazy;
use regex::Regex;

// Unterminated blocks run to the end of the input.
static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?(?:</script\s*>|\z)").unwrap());
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b.*?(?:</style\s*>|\z)").unwrap());
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?(?:-->|\z)").unwrap());
static BLOCK_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"</?(?:(?i:br|div|h[1-6]|li)|p){TAG_TAIL}")).unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"</?(?:(?i:{ELEMENTS})|[abgipqsu]|[a-z][a-z0-9]*-[-a-z0-9]*){TAG_TAIL}|(?i:<!doctype[^>]*>)"
    ))
    .unwrap()
});
static FORBIDDEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<script|<style|<!--").unwrap());
static NUMERIC_ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").unwrap());
static INLINE_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());

/// Attributes and the closing bracket of a well-formed tag. Text such as
/// `a <b && c> d` or `Vec<String>` does not match.
const TAG_TAIL: &str = r#"(?:\s+[A-Za-z_:@][-A-Za-z0-9_:.@]*(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*\s*/?>"#;

/// Multi-letter element names stripped as tags. Single-letter ones only count in lower case.
const ELEMENTS: &str = "abbr|address|article|aside|audio|bdi|bdo|big|blockquote|body|br|button|\
canvas|caption|center|circle|cite|code|col|colgroup|data|dd|defs|del|details|dfn|dialog|div|dl|dt|\
em|embed|fieldset|figcaption|figure|font|footer|form|h[1-6]|head|header|hgroup|hr|html|iframe|img|\
input|ins|kbd|label|legend|li|line|link|main|map|mark|meta|nav|noscript|object|ol|optgroup|option|\
output|path|picture|polygon|polyline|pre|rect|rp|rt|ruby|samp|section|select|small|source|span|\
strike|strong|sub|summary|sup|svg|table|tbody|td|template|textarea|tfoot|th|thead|time|title|tr|\
track|tt|ul|use|var|video|wbr";

/// Named entities decoded by [`decode_entities`]. `&amp;` goes last so `&amp;lt;` stays literal in one pass.
const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&amp;", "&"),
];

/// Convert an HTML fragment to plain text.
///
/// Markup is stripped before entities are decoded, so escaped text like
/// `a &lt; b` or `Vec&lt;String&gt;` survives as `a < b` and `Vec<String>`.
/// Nested escapes are decoded all the way down and any well-formed tag they
/// spell out is stripped too. Each round of that loop shortens the text, so it
/// ends without a cap. The result never contains `<script`, `<style` or `<!--`,
/// and `clean(clean(x)) == clean(x)`.
pub fn clean(html: &str) -> String {
    let mut text = strip_markup(html);
    loop {
        let next = strip_markup(&decode_entities(&text));
        if next == text {
            break;
        }
        text = next;
    }
    collapse_whitespace(&text)
}

fn strip_markup(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = COMMENT_RE.replace_all(&text, "");
    let text = BLOCK_TAG_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let mut text = text.into_owned();
    // Removing one marker can join the pieces of another.
    while FORBIDDEN_RE.is_match(&text) {
        text = FORBIDDEN_RE.replace_all(&text, "").into_owned();
    }
    text
}

/// Decode the named entities in [`ENTITIES`] and decimal/hex numeric references.
pub fn decode_entities(s: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(s, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        match code.and_then(char::from_u32) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    });

    let mut result = numeric.into_owned();
    for (entity, replacement) in ENTITIES {
        result = result.replace(entity, replacement);
    }
    result
}

/// Collapse spaces within lines, drop blank lines, trim the ends.
fn collapse_whitespace(s: &str) -> String {
    let normalized = s.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split('\n')
        .map(|line| INLINE_SPACE_RE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

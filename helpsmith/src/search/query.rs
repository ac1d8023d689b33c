//! Query-side helpers: wildcard patterns and result snippets

use regex::{Regex, RegexBuilder};

/// Target snippet length in bytes, before the highlight markup
const SNIPPET_LENGTH: usize = 150;

/// Compile a `*`/`?` wildcard pattern into a case-insensitive regex.
///
/// `*` matches any run of characters, `?` exactly one; everything else is
/// literal.
pub fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut escaped = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '*' => escaped.push_str(".*"),
            '?' => escaped.push('.'),
            '.' | '+' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    RegexBuilder::new(&escaped).case_insensitive(true).build().ok()
}

/// Build a highlighted HTML snippet around the first occurrence of `query`.
///
/// The snippet starts roughly 50 bytes before the match, snapped forward to
/// a word boundary, and runs about 100 bytes past it. The text is
/// HTML-escaped and every occurrence of the query is wrapped in `<mark>`.
/// Without a match the document prefix is returned unhighlighted.
pub fn snippet(text: &str, query: &str) -> String {
    if text.is_empty() || query.is_empty() {
        return String::new();
    }

    let clean: String = query
        .chars()
        .filter(|c| *c != '*' && *c != '?')
        .collect::<String>()
        .to_lowercase();

    // The match is located in the original text; case folding can change
    // byte lengths, so offsets from a lowercased copy would not line up
    let matched = if clean.is_empty() {
        None
    } else {
        RegexBuilder::new(&regex::escape(&clean))
            .case_insensitive(true)
            .build()
            .ok()
            .and_then(|re| re.find(text))
    };

    let Some(matched) = matched else {
        let end = floor_boundary(text, SNIPPET_LENGTH.min(text.len()));
        let mut prefix = escape_html(&text[..end]);
        if text.len() > SNIPPET_LENGTH {
            prefix.push_str("...");
        }
        return prefix;
    };

    let pos = matched.start();
    let mut start = floor_boundary(text, pos.saturating_sub(50));
    let end = floor_boundary(text, (matched.end() + 100).min(text.len()));

    // Avoid starting mid-word
    if start > 0 {
        if let Some(space) = text[start..pos].find(' ') {
            start += space + 1;
        }
    }

    let mut body = escape_html(&text[start..end]);
    if let Some(highlight) = RegexBuilder::new(&regex::escape(&escape_html(&clean)))
        .case_insensitive(true)
        .build()
        .ok()
    {
        body = highlight.replace_all(&body, "<mark>$0</mark>").into_owned();
    }

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&body);
    if end < text.len() {
        out.push_str("...");
    }
    out
}

/// Escape text for inclusion in result HTML
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Largest char boundary at or below `index`
fn floor_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

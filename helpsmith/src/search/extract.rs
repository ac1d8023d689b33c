//! Plain-text extraction from topic pages
//!
//! Topic pages come from a legacy WebHelp export and carry viewer chrome
//! around the actual content: inline scripts, navigation strips, breadcrumb
//! rows and "Click to Display Table of Contents" links. All of that is
//! stripped before indexing so searches only hit real topic text.

use regex::Regex;

/// Container markers tried in order; the first present wins
const CONTENT_MARKERS: [&str; 4] = [
    r#"id="innerdiv""#,
    r#"id="idcontent""#,
    r#"class="content""#,
    "<main",
];

/// Extract searchable plain text from a topic page.
pub fn extract_text(html: &str) -> String {
    let mut text = strip_blocks(html);
    text = strip_boilerplate(&text);
    text = select_content(&text);

    let tag = Regex::new(r"<[^>]+>").expect("static regex");
    let stripped = tag.replace_all(&text, " ");
    collapse_whitespace(&unescape_entities(&stripped))
}

/// Remove elements whose content is never topic text, body included
fn strip_blocks(html: &str) -> String {
    let comments = Regex::new(r"(?s)<!--.*?-->").expect("static regex");
    let mut out = comments.replace_all(html, " ").into_owned();

    for tag in ["script", "style", "noscript", "title", "nav", "header", "footer"] {
        let re = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
            .expect("static regex");
        out = re.replace_all(&out, " ").into_owned();
    }
    out
}

/// Remove legacy viewer chrome: header/breadcrumb containers and the
/// expand-all paragraph with its "Click to Display" link
fn strip_boilerplate(html: &str) -> String {
    let mut out = html.to_string();

    for tag in ["div", "p", "table"] {
        let re = Regex::new(&format!(
            r#"(?is)<{tag}\b[^>]*(?:id="(?:idheader|printheader|idnav)"|class="[^"]*(?:breadcrumb|navigation)[^"]*")[^>]*>.*?</{tag}\s*>"#
        ))
        .expect("static regex");
        out = re.replace_all(&out, " ").into_owned();
    }

    // Paragraphs first so the marker text is gone before the coarser
    // div pass could swallow a real content container
    for tag in ["p", "div"] {
        let re = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
            .expect("static regex");
        out = re
            .replace_all(&out, |caps: &regex::Captures| {
                let block = &caps[0];
                let is_backlink = block.contains("<a")
                    && (block.contains("Click to Display")
                        || block.contains("Table of Contents"));
                if is_backlink {
                    " ".to_string()
                } else {
                    block.to_string()
                }
            })
            .into_owned();
    }
    out
}

/// Narrow to the main content container when the page has one
fn select_content(html: &str) -> String {
    for marker in CONTENT_MARKERS {
        if let Some(found) = html.find(marker) {
            // Attribute markers sit inside their open tag; step back to it
            let open_start = if marker.starts_with('<') {
                found
            } else {
                match html[..found].rfind('<') {
                    Some(lt) => lt,
                    None => continue,
                }
            };
            if let Some(slice) = element_slice(html, open_start) {
                return slice.to_string();
            }
        }
    }
    html.to_string()
}

/// Slice of `html` covering the element whose open tag starts at
/// `open_start`, located by depth-counting tags of the same name
fn element_slice(html: &str, open_start: usize) -> Option<&str> {
    let after_lt = &html[open_start + 1..];
    let name_end = after_lt.find(|c: char| !c.is_ascii_alphanumeric())?;
    let name = &after_lt[..name_end];
    if name.is_empty() {
        return None;
    }

    let open_re = Regex::new(&format!(r"(?i)</?{}\b", regex::escape(name))).ok()?;
    let mut depth = 0i32;
    for found in open_re.find_iter(&html[open_start..]) {
        if found.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                let close_end = html[open_start + found.start()..]
                    .find('>')
                    .map(|gt| open_start + found.start() + gt + 1)?;
                return Some(&html[open_start..close_end]);
            }
        } else {
            depth += 1;
        }
    }
    None
}

fn unescape_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Orphaned-resource detection
//!
//! Two independent checks over the project tree:
//! - orphan pages: `.htm` files that no TOC node links to
//! - unused images: image files nothing in any page or stylesheet refers to
//!
//! Legacy viewer shell files (`hmcontent.htm` and friends) are never
//! reported as orphans even though the TOC does not link them.

use std::collections::BTreeSet;

use log::{info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use regex::Regex;

use crate::fs_access::{FileAccess, FileAccessError};
use crate::toc::TocDocument;

/// Viewer shell and landing files excluded from orphan detection
const SYSTEM_FILES: [&str; 10] = [
    "hmcontent.htm",
    "hmindex.htm",
    "hmtopic.htm",
    "hmsearch.htm",
    "hmresult.htm",
    "hmquery.htm",
    "hmnavigation.htm",
    "default.htm",
    "index.htm",
    "toc.htm",
];

/// Extensions treated as images, lowercase without the dot
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "svg", "bmp", "webp"];

/// One page not reachable from the TOC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanPage {
    /// Path relative to the project root
    pub filename: String,
    /// Page `<title>`, first `<h1>` or the bare filename
    pub title: String,
    /// Local image references found on the page
    pub images: Vec<String>,
    /// Linked stylesheet hrefs
    pub styles: Vec<String>,
}

/// Result of a full project scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub orphan_pages: Vec<OrphanPage>,
    pub unused_images: Vec<String>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_pages.is_empty() && self.unused_images.is_empty()
    }
}

/// Normalize a url for comparison: lowercase, fragment/query stripped,
/// percent-decoded, forward slashes, no leading `./`
pub fn normalize_url(url: &str) -> String {
    let mut u = url.to_lowercase();
    if let Some(hash) = u.find('#') {
        u.truncate(hash);
    }
    if let Some(question) = u.find('?') {
        u.truncate(question);
    }
    u = percent_decode(&u);
    u = u.replace('\\', "/");
    u.strip_prefix("./").unwrap_or(&u).to_string()
}

/// Decode `%xx` escapes; malformed escapes pass through unchanged
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        // Hex digits are checked on the raw bytes; the byte after `%` may
        // sit inside a multi-byte character
        if bytes[pos] == b'%' && pos + 2 < bytes.len() {
            let hi = char::from(bytes[pos + 1]).to_digit(16);
            let lo = char::from(bytes[pos + 2]).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                pos += 3;
                continue;
            }
        }
        out.push(bytes[pos]);
        pos += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_system_file(normalized: &str) -> bool {
    SYSTEM_FILES.contains(&normalized) || SYSTEM_FILES.contains(&base_name(normalized))
}

/// Every normalized page url reachable from the TOC
fn collect_toc_urls(toc: &TocDocument) -> BTreeSet<String> {
    toc.page_urls().iter().map(|url| normalize_url(url)).collect()
}

/// Find `.htm` files not reachable from the TOC.
///
/// A file counts as reachable when either its normalized path or its bare
/// filename appears in the TOC; system files are skipped outright.
pub fn detect_orphan_pages(
    toc: &TocDocument,
    fs: &dyn FileAccess,
) -> Result<Vec<OrphanPage>, FileAccessError> {
    let toc_urls = collect_toc_urls(toc);
    let all_pages = fs.list_files_recursive("", &["htm"])?;

    let candidates: Vec<String> = all_pages
        .into_iter()
        .filter(|filename| {
            let normalized = normalize_url(filename);
            let base = base_name(&normalized).to_string();
            !is_system_file(&normalized)
                && !toc_urls.contains(&normalized)
                && !toc_urls.contains(&base)
        })
        .collect();

    Ok(read_page_infos(&candidates, fs))
}

#[cfg(feature = "parallel")]
fn read_page_infos(candidates: &[String], fs: &dyn FileAccess) -> Vec<OrphanPage> {
    candidates
        .par_iter()
        .map(|filename| extract_page_info(filename, fs))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn read_page_infos(candidates: &[String], fs: &dyn FileAccess) -> Vec<OrphanPage> {
    candidates
        .iter()
        .map(|filename| extract_page_info(filename, fs))
        .collect()
}

/// Title, image references and stylesheet links of one page.
///
/// An unreadable page still yields an entry, titled by its filename.
pub fn extract_page_info(filename: &str, fs: &dyn FileAccess) -> OrphanPage {
    let fallback_title = filename
        .strip_suffix(".htm")
        .or_else(|| filename.strip_suffix(".HTM"))
        .unwrap_or(filename)
        .to_string();

    let html = match fs.read_text_file(filename) {
        Ok(html) => html,
        Err(err) => {
            warn!("cannot read {filename}: {err}");
            return OrphanPage {
                filename: filename.to_string(),
                title: fallback_title,
                images: Vec::new(),
                styles: Vec::new(),
            };
        }
    };

    let title = page_title(&html).unwrap_or(fallback_title);

    let mut images = BTreeSet::new();
    for reference in attribute_references(&html) {
        if !is_external(&reference) {
            images.insert(reference);
        }
    }
    for reference in css_url_references(&html) {
        if !is_external(&reference) {
            images.insert(reference);
        }
    }

    let styles = stylesheet_links(&html);

    OrphanPage {
        filename: filename.to_string(),
        title,
        images: images.into_iter().collect(),
        styles,
    }
}

/// `<title>` content, falling back to the first `<h1>`
fn page_title(html: &str) -> Option<String> {
    let title = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex");
    let h1 = Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("static regex");
    let tag = Regex::new(r"<[^>]+>").expect("static regex");

    for re in [title, h1] {
        if let Some(caps) = re.captures(html) {
            let text = tag.replace_all(&caps[1], " ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// `src="..."` and `background="..."` attribute values
fn attribute_references(html: &str) -> Vec<String> {
    let re = Regex::new(r#"(?i)(?:src|background)\s*=\s*["']([^"']+)["']"#)
        .expect("static regex");
    re.captures_iter(html)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// `url(...)` values from inline styles or stylesheet text
fn css_url_references(text: &str) -> Vec<String> {
    let re = Regex::new(r#"(?i)url\(\s*["']?([^"')]+?)["']?\s*\)"#).expect("static regex");
    re.captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// `<link rel="stylesheet" href="...">` hrefs, in document order
fn stylesheet_links(html: &str) -> Vec<String> {
    let link = Regex::new(r"(?is)<link\b[^>]*>").expect("static regex");
    let rel = Regex::new(r#"(?i)rel\s*=\s*["']stylesheet["']"#).expect("static regex");
    let href = Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("static regex");

    link.find_iter(html)
        .filter(|found| rel.is_match(found.as_str()))
        .filter_map(|found| href.captures(found.as_str()).map(|caps| caps[1].to_string()))
        .collect()
}

fn is_external(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("http")
        || lower.starts_with("data:")
        || lower.starts_with("file://")
}

/// Find image files nothing references.
///
/// References are collected from every `.htm` file (`src`, `background`,
/// inline `url(...)`) and every top-level `.css` file. An image counts as
/// used when either its normalized path or its bare filename is referenced.
pub fn detect_unused_images(fs: &dyn FileAccess) -> Result<Vec<String>, FileAccessError> {
    let all_images = fs.list_files_recursive("", &IMAGE_EXTENSIONS)?;
    if all_images.is_empty() {
        return Ok(Vec::new());
    }

    let mut referenced: BTreeSet<String> = BTreeSet::new();

    for page in fs.list_files_recursive("", &["htm"])? {
        let html = match fs.read_text_file(&page) {
            Ok(html) => html,
            Err(err) => {
                warn!("cannot scan {page}: {err}");
                continue;
            }
        };
        for reference in attribute_references(&html)
            .into_iter()
            .chain(css_url_references(&html))
        {
            if !is_external(&reference) {
                referenced.insert(reference.replace('\\', "/").to_lowercase());
            }
        }
    }

    for css_file in fs.list_files("", "css")? {
        let css = match fs.read_text_file(&css_file) {
            Ok(css) => css,
            Err(err) => {
                warn!("cannot scan {css_file}: {err}");
                continue;
            }
        };
        for reference in css_url_references(&css) {
            if !is_external(&reference) {
                referenced.insert(reference.replace('\\', "/").to_lowercase());
            }
        }
    }

    Ok(all_images
        .into_iter()
        .filter(|image| {
            let normalized = image.replace('\\', "/").to_lowercase();
            let base = base_name(&normalized).to_string();
            !referenced.contains(&normalized) && !referenced.contains(&base)
        })
        .collect())
}

/// Run both detectors and collect a report.
///
/// A failure in one detector logs and leaves that half of the report empty
/// rather than discarding the other half.
pub fn scan(toc: &TocDocument, fs: &dyn FileAccess) -> ScanReport {
    let orphan_pages = match detect_orphan_pages(toc, fs) {
        Ok(pages) => pages,
        Err(err) => {
            warn!("orphan page detection failed: {err}");
            Vec::new()
        }
    };
    let unused_images = match detect_unused_images(fs) {
        Ok(images) => images,
        Err(err) => {
            warn!("unused image detection failed: {err}");
            Vec::new()
        }
    };

    info!(
        "scan complete: {} orphan pages, {} unused images",
        orphan_pages.len(),
        unused_images.len()
    );
    ScanReport {
        orphan_pages,
        unused_images,
    }
}

//! End-to-end tests for orphan and unused-resource scanning

use helpsmith::fs_access::MemoryFileAccess;
use helpsmith::project::{ProjectSession, TOC_FILE};

fn seeded_fs() -> MemoryFileAccess {
    let fs = MemoryFileAccess::new();
    fs.insert(
        TOC_FILE,
        r#"<html><head><title>Manual</title></head><body>
           <ul id="toc">
             <li id="i1"><a href="intro.htm"><span>Introduction</span></a></li>
             <li id="i2"><a href="pages/setup.htm"><span>Setup</span></a></li>
           </ul></body></html>"#,
    );
    fs.insert(
        "intro.htm",
        r#"<html><body><img src="img/logo.png"><p>Intro</p></body></html>"#,
    );
    fs.insert(
        "pages/setup.htm",
        r#"<html><body><div style="background-image: url('img/wizard.png')">Setup</div></body></html>"#,
    );
    // Viewer shell files, never orphans
    fs.insert("default.htm", "<html></html>");
    fs.insert("hmsearch.htm", "<html></html>");
    fs.insert("img/logo.png", "");
    fs.insert("img/wizard.png", "");
    fs
}

#[test]
fn test_clean_project() {
    let session = ProjectSession::open(seeded_fs()).unwrap();
    let report = session.scan();
    assert!(report.is_clean(), "unexpected findings: {report:?}");
}

#[test]
fn test_orphan_page_is_reported_with_metadata() {
    let fs = seeded_fs();
    fs.insert(
        "old/draft.htm",
        r#"<html><head><title>Old Draft</title>
           <link rel="stylesheet" href="draft.css"></head>
           <body><img src="sketch.png"></body></html>"#,
    );

    let session = ProjectSession::open(fs).unwrap();
    let report = session.scan();

    assert_eq!(report.orphan_pages.len(), 1);
    let orphan = &report.orphan_pages[0];
    assert_eq!(orphan.filename, "old/draft.htm");
    assert_eq!(orphan.title, "Old Draft");
    assert_eq!(orphan.images, vec!["sketch.png"]);
    assert_eq!(orphan.styles, vec!["draft.css"]);
}

#[test]
fn test_unused_image_is_reported() {
    let fs = seeded_fs();
    fs.insert("img/abandoned.png", "");

    let session = ProjectSession::open(fs).unwrap();
    let report = session.scan();
    assert_eq!(report.unused_images, vec!["img/abandoned.png"]);
}

#[test]
fn test_image_used_via_css_file() {
    let fs = seeded_fs();
    fs.insert("img/abandoned.png", "");
    fs.insert("theme.css", "h1 { background: url(img/abandoned.png); }");

    let session = ProjectSession::open(fs).unwrap();
    assert!(session.scan().unused_images.is_empty());
}

#[test]
fn test_toc_url_with_fragment_still_counts() {
    let fs = seeded_fs();
    fs.insert(
        TOC_FILE,
        r#"<ul id="toc">
           <li id="i1"><a href="intro.htm#section-2"><span>Introduction</span></a></li>
           <li id="i2"><a href="pages/setup.htm"><span>Setup</span></a></li>
         </ul>"#,
    );

    let session = ProjectSession::open(fs).unwrap();
    let report = session.scan();
    assert!(report.orphan_pages.is_empty());
}

#[test]
fn test_deleting_section_creates_orphan_unless_files_removed() {
    let mut session = ProjectSession::open(seeded_fs()).unwrap();

    session.delete_section("2", false).unwrap();
    let report = session.scan();
    assert_eq!(report.orphan_pages.len(), 1);
    assert_eq!(report.orphan_pages[0].filename, "pages/setup.htm");

    let mut session = ProjectSession::open(seeded_fs()).unwrap();
    session.delete_section("2", true).unwrap();
    let report = session.scan();
    assert!(report.orphan_pages.is_empty());
    // The page referenced wizard.png; nothing else does
    assert_eq!(report.unused_images, vec!["img/wizard.png"]);
}

//! End-to-end tests for the search index over an in-memory project

use helpsmith::fs_access::{FileAccess, MemoryFileAccess};
use helpsmith::project::{ProjectSession, TOC_FILE};
use helpsmith::search::{self, IndexState, SearchIndex};
use helpsmith::toc::codec;

fn topic(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title}</title><style>p {{ margin: 0 }}</style></head>\
         <body><h1>{title}</h1>{body}</body></html>"
    )
}

fn seeded_fs() -> MemoryFileAccess {
    let fs = MemoryFileAccess::new();
    fs.insert(
        TOC_FILE,
        r#"<html><head><title>Printer Manual</title></head><body>
           <ul id="toc">
             <li id="i1"><a href="intro.htm"><span>Introduction</span></a></li>
             <li id="i2"><a href=""><span>Tasks</span></a>
               <ul>
                 <li id="i3"><a href="install.htm"><span>Installation</span></a></li>
                 <li id="i4"><a href="trouble.htm"><span>Troubleshooting</span></a></li>
               </ul>
             </li>
           </ul></body></html>"#,
    );
    fs.insert(
        "intro.htm",
        topic("Introduction", "<p>This manual covers the laser printer family.</p>"),
    );
    fs.insert(
        "install.htm",
        topic(
            "Installation",
            "<p>Unpack the printer and install the toner cartridge before powering on.</p>",
        ),
    );
    fs.insert(
        "trouble.htm",
        topic(
            "Troubleshooting",
            "<p>Paper jams are usually caused by damp paper in the tray.</p>",
        ),
    );
    fs
}

#[test]
fn test_full_index_lifecycle() {
    let mut session = ProjectSession::open(seeded_fs()).unwrap();
    assert_eq!(session.search().state(), IndexState::Empty);

    let indexed = session.build_search_index();
    assert_eq!(indexed, 3);
    assert_eq!(session.search().state(), IndexState::Ready);
    assert!(session.fs().file_exists(search::CACHE_FILE));
}

#[test]
fn test_title_ranking_beats_content() {
    let mut session = ProjectSession::open(seeded_fs()).unwrap();
    session.build_search_index();

    // "install" prefixes one title and appears in its content too
    let results = session.search().search("install");
    assert_eq!(results[0].id, "3");
    assert_eq!(results[0].priority, 0);
}

#[test]
fn test_content_search_returns_snippet() {
    let mut session = ProjectSession::open(seeded_fs()).unwrap();
    session.build_search_index();

    let results = session.search().search("damp paper");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "4");
    assert!(results[0].snippet.contains("<mark>damp paper</mark>"));
    // Inline style blocks never leak into the indexed text
    assert!(session.search().search("margin").is_empty());
}

#[test]
fn test_wildcard_query() {
    let mut session = ProjectSession::open(seeded_fs()).unwrap();
    session.build_search_index();

    let results = session.search().search("t*shooting");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "4");
    assert!(results[0].in_title);
}

#[test]
fn test_section_edits_keep_index_consistent() {
    let mut session = ProjectSession::open(seeded_fs()).unwrap();
    session.build_search_index();

    let id = session
        .add_section(Some("2"), "Cleaning", "cleaning.htm")
        .unwrap();
    assert_eq!(session.search().search("Cleaning").len(), 1);

    session
        .update_section_content(&id, &topic("Cleaning", "<p>Wipe the drum weekly.</p>"))
        .unwrap();
    assert_eq!(session.search().search("drum weekly").len(), 1);

    session.delete_section(&id, true).unwrap();
    assert!(session.search().search("drum weekly").is_empty());
    assert!(!session.fs().file_exists("cleaning.htm"));
}

#[test]
fn test_cache_restores_without_reading_pages() {
    let cache_json = {
        let mut session = ProjectSession::open(seeded_fs()).unwrap();
        session.build_search_index();
        session.fs().read_text_file(search::CACHE_FILE).unwrap()
    };

    // New project copy without any topic pages, only the TOC and the cache
    let fs = MemoryFileAccess::new();
    fs.insert(TOC_FILE, seeded_fs().read_text_file(TOC_FILE).unwrap());
    fs.insert(search::CACHE_FILE, cache_json);

    let mut session = ProjectSession::open(fs).unwrap();
    assert_eq!(session.load_or_build_index(), 3);
    assert!(!session.search().search("toner").is_empty());
}

#[test]
fn test_version_mismatch_forces_rebuild() {
    let fs = seeded_fs();
    fs.insert(
        search::CACHE_FILE,
        r#"{"version":1,"documents":[],"invertedIndex":[]}"#,
    );

    let mut session = ProjectSession::open(fs).unwrap();
    // Stale cache is ignored; all three pages get re-read
    assert_eq!(session.load_or_build_index(), 3);
}

#[test]
fn test_query_against_standalone_index() {
    let fs = seeded_fs();
    let toc = codec::parse(&fs.read_text_file(TOC_FILE).unwrap());

    let mut index = SearchIndex::new();
    index.build(&toc, &fs);

    // Stem lookup reaches the document through the inverted index
    assert!(index.lookup_stem("printer").contains("1"));
    assert!(!index.find_similar_stems("tonre").is_empty());
}

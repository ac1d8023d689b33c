//! Project session
//!
//! A [`ProjectSession`] owns everything belonging to one opened help
//! project: the file access backend, the parsed TOC and the search index.
//! Mutations go through `&mut self` methods, so two edits can never
//! interleave on the same project.

use log::{debug, info, warn};
use thiserror::Error;

use crate::fs_access::{FileAccess, FileAccessError};
use crate::generators;
use crate::orphan::{self, ScanReport};
use crate::search::{self, SearchIndex};
use crate::toc::{codec, TocDocument, TocError, TocNode};

/// The TOC document at the project root
pub const TOC_FILE: &str = "hmcontent.htm";

/// Backup written once when a project is opened
const TOC_BACKUP_FILE: &str = "hmcontent.htm.backup";

/// Errors from session-level operations
#[derive(Error, Debug)]
pub enum ProjectError {
    /// The project directory has no TOC document
    #[error("not a help project: {TOC_FILE} is missing")]
    NotAProject,

    #[error(transparent)]
    Fs(#[from] FileAccessError),

    #[error(transparent)]
    Toc(#[from] TocError),
}

/// One opened help project
pub struct ProjectSession<F: FileAccess> {
    fs: F,
    toc: TocDocument,
    search: SearchIndex,
}

impl<F: FileAccess> ProjectSession<F> {
    /// Open a project over the given file backend.
    ///
    /// Reads and parses the TOC document and writes a one-time backup of
    /// it; a backup failure is logged but does not block opening.
    pub fn open(fs: F) -> Result<Self, ProjectError> {
        if !fs.file_exists(TOC_FILE) {
            return Err(ProjectError::NotAProject);
        }
        let html = fs.read_text_file(TOC_FILE)?;

        if let Err(err) = fs.write_text_file(TOC_BACKUP_FILE, &html) {
            warn!("could not back up {TOC_FILE}: {err}");
        }

        let toc = codec::parse(&html);
        info!("opened project: {} TOC nodes", toc.node_count());
        Ok(Self {
            fs,
            toc,
            search: SearchIndex::new(),
        })
    }

    pub fn toc(&self) -> &TocDocument {
        &self.toc
    }

    /// Direct tree access for structural edits; call [`save_toc`] after
    ///
    /// [`save_toc`]: Self::save_toc
    pub fn toc_mut(&mut self) -> &mut TocDocument {
        &mut self.toc
    }

    pub fn search(&self) -> &SearchIndex {
        &self.search
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Serialize the tree back to the TOC document
    pub fn save_toc(&mut self) -> Result<(), ProjectError> {
        let html = codec::serialize(&self.toc);
        self.fs.write_text_file(TOC_FILE, &html)?;
        // Later serializations recover the <title> from what we just wrote
        self.toc.original_html = html;
        Ok(())
    }

    /// Restore the search index from its cache file, or build it fresh.
    ///
    /// A missing, stale or corrupt cache falls back to a full build.
    pub fn load_or_build_index(&mut self) -> usize {
        if let Ok(json) = self.fs.read_text_file(search::CACHE_FILE) {
            if let Some(index) = SearchIndex::from_cache_json(&json) {
                debug!("search index restored from cache");
                self.search = index;
                return self.search.document_count();
            }
            debug!("search cache stale or unreadable, rebuilding");
        }
        self.build_search_index()
    }

    /// Build the search index from every page in the tree and persist the
    /// cache. Returns the number of indexed documents.
    pub fn build_search_index(&mut self) -> usize {
        let indexed = self.search.build(&self.toc, &self.fs);
        self.save_search_cache();
        indexed
    }

    fn save_search_cache(&self) {
        let json = self.search.to_cache_json();
        if let Err(err) = self.fs.write_text_file(search::CACHE_FILE, &json) {
            warn!("could not persist search cache: {err}");
        }
    }

    /// Overwrite a section's page content and re-index it
    pub fn update_section_content(&mut self, id: &str, html: &str) -> Result<(), ProjectError> {
        let Some(node) = self.toc.find_node(id).cloned() else {
            return Err(TocError::NodeNotFound(id.to_string()).into());
        };
        if node.url.is_empty() {
            debug!("section {id} has no page, content ignored");
            return Ok(());
        }
        self.fs.write_text_file(&node.url, html)?;
        self.search.update_document(&node, &self.fs);
        self.save_search_cache();
        Ok(())
    }

    /// Add a section backed by a freshly created topic page.
    ///
    /// The page is written from a minimal template, the node is appended
    /// under `parent_id` (root level when `None`), the TOC is saved and the
    /// new page indexed. Returns the new node id.
    pub fn add_section(
        &mut self,
        parent_id: Option<&str>,
        title: &str,
        filename: &str,
    ) -> Result<String, ProjectError> {
        if self.fs.file_exists(filename) {
            warn!("{filename} already exists and will be overwritten");
        }
        self.fs.write_text_file(filename, &topic_template(title))?;
        self.attach_section(parent_id, title, filename)
    }

    /// Add a section pointing at an existing page (adopting an orphan)
    pub fn add_section_from_file(
        &mut self,
        parent_id: Option<&str>,
        title: &str,
        filename: &str,
    ) -> Result<String, ProjectError> {
        self.attach_section(parent_id, title, filename)
    }

    fn attach_section(
        &mut self,
        parent_id: Option<&str>,
        title: &str,
        filename: &str,
    ) -> Result<String, ProjectError> {
        let id = self.toc.add_node(parent_id, filename, title)?;
        self.save_toc()?;

        let node = TocNode::new(id.clone(), filename, title);
        self.search.update_document(&node, &self.fs);
        self.save_search_cache();
        info!("added section '{title}' as node {id}");
        Ok(id)
    }

    /// Remove a section (and its whole subtree) from the TOC.
    ///
    /// Every removed node leaves the search index; with `delete_files` the
    /// backing pages are deleted too. Returns the detached subtree.
    pub fn delete_section(
        &mut self,
        id: &str,
        delete_files: bool,
    ) -> Result<TocNode, ProjectError> {
        let removed = self.toc.remove_node(id)?;
        self.save_toc()?;

        let mut subtree = TocDocument::new();
        subtree.elements.push(removed.clone());
        subtree.for_each_node(|node, _, _| {
            self.search.remove_document(&node.id);
            if delete_files && !node.url.is_empty() {
                if let Err(err) = self.fs.delete_file(&node.url) {
                    warn!("could not delete {}: {err}", node.url);
                }
            }
        });
        self.save_search_cache();
        info!("removed section {id}");
        Ok(removed)
    }

    /// Detect orphan pages and unused images
    pub fn scan(&self) -> ScanReport {
        orphan::scan(&self.toc, &self.fs)
    }

    /// Generate all build artifacts and write them under `output_dir`
    /// ("" for the project root). Returns the artifact file names.
    pub fn build(&self, output_dir: &str) -> Result<Vec<String>, ProjectError> {
        let artifacts = generators::generate_all(&self.toc, &self.search);
        let mut written = Vec::new();
        for (name, content) in &artifacts {
            let path = if output_dir.is_empty() {
                name.clone()
            } else {
                format!("{}/{name}", output_dir.trim_end_matches('/'))
            };
            self.fs.write_text_file(&path, content)?;
            written.push(path);
        }
        info!("build complete: {} artifacts", written.len());
        Ok(written)
    }
}

/// Minimal topic page for newly created sections
fn topic_template(title: &str) -> String {
    let escaped = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{escaped}</title>\n\
         <link rel=\"stylesheet\" href=\"default.css\">\n</head>\n<body>\n\
         <h1>{escaped}</h1>\n<p>Section content</p>\n</body>\n</html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_access::MemoryFileAccess;

    fn seeded_fs() -> MemoryFileAccess {
        let fs = MemoryFileAccess::new();
        fs.insert(
            TOC_FILE,
            r#"<html><head><title>Manual</title></head><body>
               <ul id="toc">
                 <li id="i1"><a href="intro.htm"><span>Introduction</span></a></li>
               </ul></body></html>"#,
        );
        fs.insert(
            "intro.htm",
            "<html><body><p>Welcome to the manual</p></body></html>",
        );
        fs
    }

    #[test]
    fn test_open_requires_toc_file() {
        let result = ProjectSession::open(MemoryFileAccess::new());
        assert!(matches!(result, Err(ProjectError::NotAProject)));
    }

    #[test]
    fn test_open_parses_and_backs_up() {
        let session = ProjectSession::open(seeded_fs()).unwrap();
        assert_eq!(session.toc().node_count(), 1);
        assert!(session.fs().file_exists(TOC_BACKUP_FILE));
    }

    #[test]
    fn test_add_section_creates_page_and_indexes_it() {
        let mut session = ProjectSession::open(seeded_fs()).unwrap();
        session.build_search_index();

        let id = session.add_section(None, "Printing", "printing.htm").unwrap();
        assert_eq!(id, "2");
        assert!(session.fs().file_exists("printing.htm"));
        assert!(session
            .fs()
            .read_text_file(TOC_FILE)
            .unwrap()
            .contains("printing.htm"));
        assert_eq!(session.search().search("Printing").len(), 1);
    }

    #[test]
    fn test_delete_section_removes_everything() {
        let mut session = ProjectSession::open(seeded_fs()).unwrap();
        session.build_search_index();
        let id = session.add_section(None, "Printing", "printing.htm").unwrap();

        let removed = session.delete_section(&id, true).unwrap();
        assert_eq!(removed.url, "printing.htm");
        assert!(!session.fs().file_exists("printing.htm"));
        assert!(session.search().search("Printing").is_empty());
        assert!(!session
            .fs()
            .read_text_file(TOC_FILE)
            .unwrap()
            .contains("printing.htm"));
    }

    #[test]
    fn test_index_cache_round_trip() {
        let fs = seeded_fs_with_cache();
        // With the page gone, only a cache hit can still know its content
        fs.delete_file("intro.htm").unwrap();

        let mut session = ProjectSession::open(fs).unwrap();
        assert_eq!(session.load_or_build_index(), 1);
        assert!(session.search().is_ready());
    }

    fn seeded_fs_with_cache() -> MemoryFileAccess {
        let fs = seeded_fs();
        let mut session = ProjectSession::open(seeded_fs()).unwrap();
        session.build_search_index();
        fs.insert(
            search::CACHE_FILE,
            session.fs().read_text_file(search::CACHE_FILE).unwrap(),
        );
        fs
    }

    #[test]
    fn test_stale_cache_triggers_rebuild() {
        let fs = seeded_fs();
        fs.insert(search::CACHE_FILE, r#"{"version":1}"#);

        let mut session = ProjectSession::open(fs).unwrap();
        assert_eq!(session.load_or_build_index(), 1);
        assert!(session.search().is_ready());
    }

    #[test]
    fn test_update_section_content_reindexes() {
        let mut session = ProjectSession::open(seeded_fs()).unwrap();
        session.build_search_index();

        session
            .update_section_content("1", "<html><body><p>Totally new words</p></body></html>")
            .unwrap();
        assert_eq!(session.search().search("totally new").len(), 1);
        assert!(session.search().search("welcome").is_empty());
    }

    #[test]
    fn test_build_writes_artifacts() {
        let mut session = ProjectSession::open(seeded_fs()).unwrap();
        session.build_search_index();

        let written = session.build("out").unwrap();
        assert_eq!(written.len(), 5);
        assert!(session.fs().file_exists("out/helpCodes.xml"));
        assert!(session.fs().file_exists("out/toc.js"));
    }
}

//! Structural edit operations on the TOC tree
//!
//! All operations are pure tree mutations: they never touch the filesystem.
//! Creating or deleting the backing topic file is the caller's job (see
//! `ProjectSession`). Lookups that miss return `None`/`false`; only the
//! cyclic-move guard is a hard error, because silently accepting such a move
//! would detach the subtree from the tree entirely.

use thiserror::Error;

use super::{TocDocument, TocNode};

/// Errors from structural edits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TocError {
    /// The referenced node id does not exist in the tree
    #[error("node '{0}' not found in the table of contents")]
    NodeNotFound(String),

    /// The move target lies inside the subtree being moved
    #[error("cannot move '{id}' under '{target}': target is inside the moved subtree")]
    CyclicMove {
        /// Id of the node being moved
        id: String,
        /// Id of the rejected target parent
        target: String,
    },
}

/// Position of a node within its owning children list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    /// Id of the parent node, or None for root-level nodes
    pub parent_id: Option<String>,
    /// Index within the owning list
    pub index: usize,
}

impl TocDocument {
    /// Depth-first search for a node by id, current subtree first
    pub fn find_node(&self, id: &str) -> Option<&TocNode> {
        fn walk<'a>(nodes: &'a [TocNode], id: &str) -> Option<&'a TocNode> {
            for node in nodes {
                if node.id == id {
                    return Some(node);
                }
                if let Some(found) = walk(&node.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.elements, id)
    }

    /// Mutable variant of [`find_node`](Self::find_node)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut TocNode> {
        fn walk<'a>(nodes: &'a mut [TocNode], id: &str) -> Option<&'a mut TocNode> {
            for node in nodes {
                if node.id == id {
                    return Some(node);
                }
                if let Some(found) = walk(&mut node.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&mut self.elements, id)
    }

    /// Find the parent and index of a node
    pub fn find_parent_and_index(&self, id: &str) -> Option<NodeLocation> {
        let path = self.locate(id)?;
        let index = *path.last().expect("locate never returns an empty path");
        let parent_id = if path.len() > 1 {
            Some(self.node_at(&path[..path.len() - 1]).id.clone())
        } else {
            None
        };
        Some(NodeLocation { parent_id, index })
    }

    /// Generate a fresh id: the maximum integer prefix over all existing ids,
    /// plus one.
    ///
    /// Ids freed by deletion are not reused.
    pub fn generate_new_id(&self) -> String {
        let mut max_num: u64 = 0;
        self.for_each_node(|node, _, _| {
            let prefix = node.id.split('.').next().unwrap_or("");
            if let Ok(num) = prefix.parse::<u64>() {
                max_num = max_num.max(num);
            }
        });
        (max_num + 1).to_string()
    }

    /// Add a new node as the last child of `parent_id` (or at root level)
    /// and return its assigned id.
    pub fn add_node(
        &mut self,
        parent_id: Option<&str>,
        url: &str,
        text: &str,
    ) -> Result<String, TocError> {
        let new_id = self.generate_new_id();
        let node = TocNode::new(new_id.clone(), url, text);

        match parent_id {
            None => self.elements.push(node),
            Some(pid) => {
                let parent = self
                    .find_node_mut(pid)
                    .ok_or_else(|| TocError::NodeNotFound(pid.to_string()))?;
                parent.children.push(node);
            }
        }
        Ok(new_id)
    }

    /// Detach a node and its entire subtree, returning it.
    ///
    /// Children are removed with the node; there is no re-parenting.
    pub fn remove_node(&mut self, id: &str) -> Result<TocNode, TocError> {
        let path = self
            .locate(id)
            .ok_or_else(|| TocError::NodeNotFound(id.to_string()))?;
        let index = *path.last().expect("non-empty path");
        let list = self.list_mut(&path[..path.len() - 1]);
        Ok(list.remove(index))
    }

    /// Move a node to become the last child of `new_parent_id` (or the last
    /// root-level node).
    ///
    /// A target inside the moved subtree is rejected with
    /// [`TocError::CyclicMove`].
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<(), TocError> {
        if let Some(target) = new_parent_id {
            let node = self
                .find_node(id)
                .ok_or_else(|| TocError::NodeNotFound(id.to_string()))?;
            if subtree_contains(node, target) {
                return Err(TocError::CyclicMove {
                    id: id.to_string(),
                    target: target.to_string(),
                });
            }
            if self.find_node(target).is_none() {
                return Err(TocError::NodeNotFound(target.to_string()));
            }
        }

        let node = self.remove_node(id)?;
        match new_parent_id {
            None => self.elements.push(node),
            Some(pid) => {
                // Checked above; the tree has not lost the target since.
                let parent = self
                    .find_node_mut(pid)
                    .expect("move target verified before detach");
                parent.children.push(node);
            }
        }
        Ok(())
    }

    /// Swap a node with its previous sibling. No-op (returns false) at the
    /// start of the list or if the id is unknown.
    pub fn move_up(&mut self, id: &str) -> bool {
        let Some(path) = self.locate(id) else {
            return false;
        };
        let index = *path.last().expect("non-empty path");
        if index == 0 {
            return false;
        }
        self.list_mut(&path[..path.len() - 1]).swap(index, index - 1);
        true
    }

    /// Swap a node with its next sibling. No-op (returns false) at the end
    /// of the list or if the id is unknown.
    pub fn move_down(&mut self, id: &str) -> bool {
        let Some(path) = self.locate(id) else {
            return false;
        };
        let index = *path.last().expect("non-empty path");
        let list = self.list_mut(&path[..path.len() - 1]);
        if index + 1 >= list.len() {
            return false;
        }
        list.swap(index, index + 1);
        true
    }

    /// Make a node the last child of its previous sibling. No-op (returns
    /// false) if the node is first in its list or the id is unknown.
    pub fn indent(&mut self, id: &str) -> bool {
        let Some(path) = self.locate(id) else {
            return false;
        };
        let index = *path.last().expect("non-empty path");
        if index == 0 {
            return false;
        }
        let list = self.list_mut(&path[..path.len() - 1]);
        let node = list.remove(index);
        list[index - 1].children.push(node);
        true
    }

    /// Promote a node to its parent's sibling level, inserted immediately
    /// after the parent. No-op (returns false) for root-level nodes or an
    /// unknown id.
    pub fn outdent(&mut self, id: &str) -> bool {
        let Some(path) = self.locate(id) else {
            return false;
        };
        if path.len() < 2 {
            return false;
        }
        let index = *path.last().expect("non-empty path");
        let node = self.list_mut(&path[..path.len() - 1]).remove(index);
        let parent_index = path[path.len() - 2];
        let grandparent_list = self.list_mut(&path[..path.len() - 2]);
        grandparent_list.insert(parent_index + 1, node);
        true
    }

    /// Index path from the root to the node with the given id
    fn locate(&self, id: &str) -> Option<Vec<usize>> {
        fn walk(nodes: &[TocNode], id: &str, path: &mut Vec<usize>) -> bool {
            for (index, node) in nodes.iter().enumerate() {
                path.push(index);
                if node.id == id || walk(&node.children, id, path) {
                    return true;
                }
                path.pop();
            }
            false
        }
        let mut path = Vec::new();
        walk(&self.elements, id, &mut path).then_some(path)
    }

    /// Node at an index path. Panics on a stale path; paths are only used
    /// internally between locate and the mutation that consumes them.
    fn node_at(&self, path: &[usize]) -> &TocNode {
        let mut node = &self.elements[path[0]];
        for &index in &path[1..] {
            node = &node.children[index];
        }
        node
    }

    /// Children list owned by the node at `parent_path` (the root list for
    /// an empty path)
    fn list_mut(&mut self, parent_path: &[usize]) -> &mut Vec<TocNode> {
        let mut list = &mut self.elements;
        for &index in parent_path {
            list = &mut list[index].children;
        }
        list
    }
}

/// Whether `id` names the given node or any of its descendants
fn subtree_contains(node: &TocNode, id: &str) -> bool {
    if node.id == id {
        return true;
    }
    node.children.iter().any(|child| subtree_contains(child, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TocDocument {
        let mut doc = TocDocument::new();
        doc.add_node(None, "intro.htm", "Introduction").unwrap();
        doc.add_node(None, "", "Guide").unwrap();
        doc.add_node(Some("2"), "install.htm", "Installation").unwrap();
        doc.add_node(Some("2"), "config.htm", "Configuration").unwrap();
        doc
    }

    #[test]
    fn test_find_node_on_empty_tree() {
        let doc = TocDocument::new();
        assert!(doc.find_node("x").is_none());
    }

    #[test]
    fn test_add_first_node_gets_id_one() {
        let mut doc = TocDocument::new();
        let id = doc.add_node(None, "a.htm", "Intro").unwrap();
        assert_eq!(id, "1");
        assert_eq!(doc.elements.len(), 1);
        assert_eq!(doc.elements[0].url, "a.htm");
        assert_eq!(doc.elements[0].text, "Intro");
        assert_eq!(doc.generate_new_id(), "2");
    }

    #[test]
    fn test_generated_ids_stay_unique_across_add_delete_cycles() {
        let mut doc = TocDocument::new();
        let a = doc.add_node(None, "a.htm", "A").unwrap();
        let b = doc.add_node(None, "b.htm", "B").unwrap();
        doc.remove_node(&a).unwrap();

        let c = doc.add_node(None, "c.htm", "C").unwrap();
        assert_ne!(c, b);
        assert!(doc.find_node(&c).is_some());

        doc.remove_node(&b).unwrap();
        doc.remove_node(&c).unwrap();
        // Deleted ids are not reused even with an emptier tree
        let d = doc.add_node(None, "d.htm", "D").unwrap();
        assert_eq!(d, "1");
    }

    #[test]
    fn test_find_parent_and_index() {
        let doc = sample_tree();
        let loc = doc.find_parent_and_index("4").unwrap();
        assert_eq!(loc.parent_id.as_deref(), Some("2"));
        assert_eq!(loc.index, 1);

        let root = doc.find_parent_and_index("2").unwrap();
        assert_eq!(root.parent_id, None);
        assert_eq!(root.index, 1);

        assert!(doc.find_parent_and_index("99").is_none());
    }

    #[test]
    fn test_remove_node_detaches_subtree() {
        let mut doc = sample_tree();
        let removed = doc.remove_node("2").unwrap();
        assert_eq!(removed.children.len(), 2);
        assert!(doc.find_node("3").is_none());
        assert!(doc.find_node("4").is_none());
        assert_eq!(doc.elements.len(), 1);
    }

    #[test]
    fn test_remove_unknown_node() {
        let mut doc = sample_tree();
        assert_eq!(
            doc.remove_node("99"),
            Err(TocError::NodeNotFound("99".to_string()))
        );
    }

    #[test]
    fn test_move_node_to_new_parent() {
        let mut doc = sample_tree();
        doc.move_node("1", Some("2")).unwrap();
        let guide = doc.find_node("2").unwrap();
        assert_eq!(guide.children.last().unwrap().id, "1");
        assert_eq!(doc.elements.len(), 1);
    }

    #[test]
    fn test_move_node_to_root() {
        let mut doc = sample_tree();
        doc.move_node("3", None).unwrap();
        assert_eq!(doc.elements.last().unwrap().id, "3");
    }

    #[test]
    fn test_move_into_own_descendant_is_rejected() {
        let mut doc = sample_tree();
        let err = doc.move_node("2", Some("3")).unwrap_err();
        assert_eq!(
            err,
            TocError::CyclicMove {
                id: "2".to_string(),
                target: "3".to_string(),
            }
        );
        // Tree unchanged
        assert_eq!(doc.node_count(), 4);
        assert_eq!(doc.find_parent_and_index("3").unwrap().parent_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_move_onto_itself_is_rejected() {
        let mut doc = sample_tree();
        assert!(matches!(
            doc.move_node("1", Some("1")),
            Err(TocError::CyclicMove { .. })
        ));
    }

    #[test]
    fn test_reorder_boundaries_are_noops() {
        let mut doc = sample_tree();
        let before = doc.elements.clone();

        assert!(!doc.move_up("1"));
        assert!(!doc.move_down("2"));
        assert!(!doc.move_up("3"));
        assert!(!doc.move_down("4"));
        assert_eq!(doc.elements, before);

        assert!(doc.move_up("2"));
        assert_eq!(doc.elements[0].id, "2");
        assert!(doc.move_down("2"));
        assert_eq!(doc.elements[1].id, "2");
    }

    #[test]
    fn test_indent_then_outdent_restores_position() {
        let mut doc = sample_tree();
        let before = doc.elements.clone();

        assert!(doc.indent("2"));
        let intro = doc.find_node("1").unwrap();
        assert_eq!(intro.children.last().unwrap().id, "2");

        assert!(doc.outdent("2"));
        assert_eq!(doc.elements, before);
    }

    #[test]
    fn test_indent_first_sibling_is_noop() {
        let mut doc = sample_tree();
        let before = doc.elements.clone();
        assert!(!doc.indent("1"));
        assert!(!doc.indent("3"));
        assert_eq!(doc.elements, before);
    }

    #[test]
    fn test_outdent_root_node_is_noop() {
        let mut doc = sample_tree();
        let before = doc.elements.clone();
        assert!(!doc.outdent("1"));
        assert_eq!(doc.elements, before);
    }

    #[test]
    fn test_outdent_inserts_after_parent() {
        let mut doc = sample_tree();
        assert!(doc.outdent("3"));
        assert_eq!(
            doc.elements.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );
        assert_eq!(doc.find_node("2").unwrap().children.len(), 1);
    }

    #[test]
    fn test_generate_new_id_ignores_non_numeric_prefixes() {
        let mut doc = TocDocument::new();
        doc.elements.push(TocNode::new("item_5", "x.htm", "X"));
        doc.elements.push(TocNode::new("7.2", "y.htm", "Y"));
        assert_eq!(doc.generate_new_id(), "8");
    }
}

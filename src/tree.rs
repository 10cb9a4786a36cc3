//! Construct tree - the ownership primitive behind every model element
//!
//! Every element of a threat model is registered as a node in a single
//! arena-backed tree. The tree provides stable string identity (unique per
//! sibling scope), pre-order traversal, and a lock flag that prevents
//! structural mutation while an evaluation pass walks the graph.

use std::collections::VecDeque;

use thiserror::Error;

/// Errors raised by tree construction and mutation
#[derive(Debug, Error)]
pub enum TreeError {
    /// Only the tree root may carry an empty id
    #[error("configuration error: only the root construct may have an empty id (scope: {scope})")]
    EmptyId {
        /// Path of the scope the node was added under
        scope: String,
    },

    /// A sibling with the same id already exists under this scope
    #[error("configuration error: duplicate id `{id}` under scope `{scope}`")]
    DuplicateId {
        /// Path of the scope the node was added under
        scope: String,
        /// The colliding id
        id: String,
    },

    /// The scope (or one of its ancestors) is locked
    #[error("tree mutation error: cannot add `{id}` under locked scope `{scope}`")]
    Locked {
        /// Path of the locked scope
        scope: String,
        /// Id of the rejected node
        id: String,
    },
}

/// Handle to a node in the construct tree
///
/// Handles are ordered by creation, so ordered collections keyed by `NodeId`
/// iterate in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

#[derive(Debug)]
struct NodeData {
    id: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    locked: bool,
}

/// Arena-backed construct tree
///
/// The root is created with [`Tree::new`] and carries the empty id. All other
/// nodes are registered under an existing scope and are never detached; a
/// node lives exactly as long as the tree.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    /// Create a tree containing only the root node
    #[must_use]
    pub fn new() -> (Self, NodeId) {
        let tree = Self {
            nodes: vec![NodeData {
                id: String::new(),
                parent: None,
                children: Vec::new(),
                locked: false,
            }],
        };
        (tree, NodeId(0))
    }

    /// Register a new node under `scope`
    ///
    /// Fails when `id` is empty, when a sibling already uses `id`, or when
    /// `scope` (or any of its ancestors) is locked.
    pub fn add_node(&mut self, scope: NodeId, id: &str) -> Result<NodeId, TreeError> {
        if id.is_empty() {
            return Err(TreeError::EmptyId {
                scope: self.path(scope),
            });
        }
        if self.is_locked(scope) {
            return Err(TreeError::Locked {
                scope: self.path(scope),
                id: id.to_string(),
            });
        }
        if self.find_child(scope, id).is_some() {
            return Err(TreeError::DuplicateId {
                scope: self.path(scope),
                id: id.to_string(),
            });
        }

        let node = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(NodeData {
            id: id.to_string(),
            parent: Some(scope),
            children: Vec::new(),
            locked: false,
        });
        self.data_mut(scope).children.push(node);
        Ok(node)
    }

    /// The node's own id segment (empty for the root)
    #[must_use]
    pub fn id(&self, node: NodeId) -> &str {
        &self.data(node).id
    }

    /// The node's parent scope, `None` for the root
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).parent
    }

    /// Direct children in registration order
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.data(node).children
    }

    /// Look up a direct child by id
    #[must_use]
    pub fn find_child(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.data(scope).children.iter().copied().find(|&c| self.data(c).id == id)
    }

    /// Lazy pre-order traversal of the subtree rooted at `node`
    ///
    /// The iterator is restartable: calling this again yields a fresh
    /// traversal over the current tree.
    #[must_use]
    pub fn iter_subtree(&self, node: NodeId) -> SubtreeIter<'_> {
        SubtreeIter {
            tree: self,
            pending: VecDeque::from([node]),
        }
    }

    /// Slash-joined path from the root, used in error messages
    #[must_use]
    pub fn path(&self, node: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            segments.push(self.data(n).id.clone());
            current = self.data(n).parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Set the lock flag on a node
    ///
    /// The flag is inherited: while set, no node may be added anywhere in
    /// this node's subtree.
    pub fn lock(&mut self, node: NodeId) {
        self.data_mut(node).locked = true;
    }

    /// Clear the lock flag on a node
    pub fn unlock(&mut self, node: NodeId) {
        self.data_mut(node).locked = false;
    }

    /// Whether the node or any of its ancestors is locked
    #[must_use]
    pub fn is_locked(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.data(n).locked {
                return true;
            }
            current = self.data(n).parent;
        }
        false
    }

    fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0 as usize]
    }

    fn data_mut(&mut self, node: NodeId) -> &mut NodeData {
        &mut self.nodes[node.0 as usize]
    }
}

/// Pre-order iterator over a subtree
#[derive(Debug)]
pub struct SubtreeIter<'a> {
    tree: &'a Tree,
    pending: VecDeque<NodeId>,
}

impl Iterator for SubtreeIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.pending.pop_front()?;
        for (i, &child) in self.tree.children(node).iter().enumerate() {
            self.pending.insert(i, child);
        }
        Some(node)
    }
}

/// Convert an element name into its deterministic construct id
///
/// Splits camel case and collapses whitespace, underscores, and dashes, so
/// "WebApp", "web_app", and "Web App" all map to `web-app`. Deterministic
/// ids keep risk identity a pure function of the model topology.
#[must_use]
pub fn kebab_case(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = name.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_whitespace() || c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            // Break before an uppercase run start and before a new camel hump
            let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_numeric();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev_lower || (next_lower && chars[i - 1].is_uppercase()) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_empty_id_and_no_parent() {
        let (tree, root) = Tree::new();
        assert_eq!(tree.id(root), "");
        assert!(tree.parent(root).is_none());
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn non_root_rejects_empty_id() {
        let (mut tree, root) = Tree::new();
        assert!(matches!(tree.add_node(root, ""), Err(TreeError::EmptyId { .. })));
    }

    #[test]
    fn sibling_ids_are_unique() {
        let (mut tree, root) = Tree::new();
        tree.add_node(root, "web-app").unwrap();
        assert!(matches!(
            tree.add_node(root, "web-app"),
            Err(TreeError::DuplicateId { .. })
        ));
    }

    #[test]
    fn same_id_allowed_under_different_scopes() {
        let (mut tree, root) = Tree::new();
        let a = tree.add_node(root, "a").unwrap();
        let b = tree.add_node(root, "b").unwrap();
        assert!(tree.add_node(a, "child").is_ok());
        assert!(tree.add_node(b, "child").is_ok());
    }

    #[test]
    fn preorder_traversal_visits_parents_first() {
        let (mut tree, root) = Tree::new();
        let a = tree.add_node(root, "a").unwrap();
        let a1 = tree.add_node(a, "a1").unwrap();
        let b = tree.add_node(root, "b").unwrap();

        let order: Vec<NodeId> = tree.iter_subtree(root).collect();
        assert_eq!(order, vec![root, a, a1, b]);
    }

    #[test]
    fn traversal_is_restartable() {
        let (mut tree, root) = Tree::new();
        tree.add_node(root, "a").unwrap();

        let first: Vec<NodeId> = tree.iter_subtree(root).collect();
        let second: Vec<NodeId> = tree.iter_subtree(root).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn lock_is_inherited_down_the_scope_chain() {
        let (mut tree, root) = Tree::new();
        let a = tree.add_node(root, "a").unwrap();
        tree.lock(root);

        assert!(tree.is_locked(a));
        assert!(matches!(tree.add_node(a, "child"), Err(TreeError::Locked { .. })));

        tree.unlock(root);
        assert!(tree.add_node(a, "child").is_ok());
    }

    #[test]
    fn path_joins_segments_from_root() {
        let (mut tree, root) = Tree::new();
        let a = tree.add_node(root, "a").unwrap();
        let a1 = tree.add_node(a, "a1").unwrap();
        assert_eq!(tree.path(a1), "/a/a1");
    }

    #[test]
    fn kebab_case_normalizes_names() {
        assert_eq!(kebab_case("Foo Bar"), "foo-bar");
        assert_eq!(kebab_case("foo-bar"), "foo-bar");
        assert_eq!(kebab_case("FooBar"), "foo-bar");
        assert_eq!(kebab_case("WebApp"), "web-app");
        assert_eq!(kebab_case("HTTPServer"), "http-server");
        assert_eq!(kebab_case("user_db"), "user-db");
    }
}

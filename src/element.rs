//! Element base - shared state for everything that can bear risks
//!
//! Python-style mixin inheritance becomes a composed value here: every typed
//! element embeds an [`ElementInfo`] that carries its tree node, name,
//! description, scope flag, and tag set.

use std::collections::BTreeSet;

use crate::tree::NodeId;

/// Handle to a registered component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) NodeId);

/// Handle to a registered asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(pub(crate) NodeId);

/// Handle to a registered data flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowId(pub(crate) NodeId);

/// Handle to a registered trust boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoundaryId(pub(crate) NodeId);

/// Handle to a registered mitigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MitigationId(pub(crate) NodeId);

/// Shared state embedded in every model element
#[derive(Debug, Clone)]
pub struct ElementInfo {
    pub(crate) node: Option<NodeId>,
    /// Human-readable element name; risk identity is derived from it
    pub name: String,
    /// Free-form description, carried into exports and reports
    pub description: String,
    /// Out-of-scope elements are skipped by component-scoped threat rules
    pub out_of_scope: bool,
    /// Free-form tag set
    pub tags: BTreeSet<String>,
}

impl ElementInfo {
    /// Create element state for a not-yet-registered element
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: None,
            name: name.into(),
            description: String::new(),
            out_of_scope: false,
            tags: BTreeSet::new(),
        }
    }

    /// The construct-tree node, once the element is registered in a model
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Add a tag (set semantics)
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }
}

//! Trust boundaries - groupings of equal trust
//!
//! A trust boundary is a named region of the graph. Components reference a
//! boundary; flows whose endpoints sit in different boundaries cross one.

use crate::element::ElementInfo;

/// A region of the architecture sharing one trust level
#[derive(Debug, Clone)]
pub struct TrustBoundary {
    /// Shared element state (name, description, tags)
    pub info: ElementInfo,
}

impl TrustBoundary {
    /// Create a trust boundary
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ElementInfo::new(name),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = description.into();
        self
    }
}

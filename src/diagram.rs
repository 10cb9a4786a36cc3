//! Diagram descriptors
//!
//! The engine does not render anything. It exposes, per component, a stable
//! id/name/shape triple and, per data flow, an edge descriptor; a
//! graph-drawing collaborator turns these into pictures.

use serde::Serialize;

/// Shape class of a component in a data flow diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    /// Actors and external entities
    Box,
    /// Processes
    Circle,
    /// Data stores
    Cylinder,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Box => "box",
            Self::Circle => "circle",
            Self::Cylinder => "cylinder",
        };
        write!(f, "{s}")
    }
}

/// A renderable node
#[derive(Debug, Clone, Serialize)]
pub struct DiagramNode {
    /// Stable construct id
    pub id: String,
    /// Display name
    pub name: String,
    /// Shape class
    pub shape: Shape,
}

/// A renderable edge
#[derive(Debug, Clone, Serialize)]
pub struct DiagramEdge {
    /// Construct id of the source component
    pub source: String,
    /// Construct id of the destination component
    pub destination: String,
    /// Edge label, `protocol: flow name`
    pub label: String,
    /// Whether the edge should carry arrows on both ends
    pub bidirectional: bool,
}

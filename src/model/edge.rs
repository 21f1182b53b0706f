//! Edge in the scene graph.

use serde::{Deserialize, Serialize};

use super::{AttributeKind, NodeKey};

/// Edge kind. Doubles as the edge key of the multigraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Head node → one of its attribute nodes.
    Attribute(AttributeKind),
    /// Head ↔ head spatial relation (`left`, `behind`, ...).
    SpatialRe,
    /// Head ↔ head attribute-matching relation (`same size as`).
    MatchingRe,
    /// Source ↔ target correspondence produced by the matcher.
    GroundTruth,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Attribute(kind) => kind.label(),
            EdgeKind::SpatialRe => "spatial_re",
            EdgeKind::MatchingRe => "matching_re",
            EdgeKind::GroundTruth => "<gt>",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An edge with a `{kind: value}` payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub src: NodeKey,
    pub dst: NodeKey,
    pub kind: EdgeKind,
    pub value: String,
}

impl Edge {
    pub fn new(src: NodeKey, dst: NodeKey, kind: EdgeKind, value: impl Into<String>) -> Self {
        Self { src, dst, kind, value: value.into() }
    }

    /// Whether the edge joins `a` and `b`, ignoring direction unless `directed`.
    pub fn joins(&self, a: &NodeKey, b: &NodeKey, directed: bool) -> bool {
        (self.src == *a && self.dst == *b) || (!directed && self.src == *b && self.dst == *a)
    }

    /// Payload label used by the per-entity edge-label map (`<C>:color`).
    pub fn label(&self) -> String {
        format!("{}:{}", self.dst, self.kind)
    }
}

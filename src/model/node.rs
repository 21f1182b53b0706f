//! Node in the scene graph.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{AttributeKind, Entity};

/// String node key (`obj`, `obj2`, `<Z2>`, `Gs-obj`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(pub String);

impl NodeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Head node key for the `n`-th object of a scene.
    pub fn head(ent_num: usize) -> Self {
        if ent_num <= 1 {
            Self("obj".into())
        } else {
            Self(format!("obj{ent_num}"))
        }
    }

    /// `{prefix}-{key}`.
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self(format!("{prefix}-{}", self.0))
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self { Self(s) }
}

impl PartialEq<str> for NodeKey {
    fn eq(&self, other: &str) -> bool { self.0 == other }
}

impl PartialEq<&str> for NodeKey {
    fn eq(&self, other: &&str) -> bool { self.0 == *other }
}

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "attribute", rename_all = "lowercase")]
pub enum NodeKind {
    /// One object entity.
    Head,
    /// One attribute token of an object entity.
    Attribute(AttributeKind),
}

/// A node in the scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: NodeKey,
    pub kind: NodeKind,
    /// Entity label for head nodes, attribute label for attribute nodes.
    pub label: String,
    /// Source text: the entity span or the attribute token.
    pub val: String,
    /// Scene coordinates, grounding graphs only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pos: Option<[f64; 3]>,
    /// Entity a head node was built from.
    #[serde(skip)]
    pub entity: Option<Arc<Entity>>,
}

impl Node {
    pub fn head(key: NodeKey, entity: Arc<Entity>) -> Self {
        Self {
            key,
            kind: NodeKind::Head,
            label: entity.label.as_str().to_owned(),
            val: entity.text.clone(),
            pos: None,
            entity: Some(entity),
        }
    }

    pub fn attribute(key: NodeKey, kind: AttributeKind, val: impl Into<String>) -> Self {
        Self {
            key,
            kind: NodeKind::Attribute(kind),
            label: kind.label().to_owned(),
            val: val.into(),
            pos: None,
            entity: None,
        }
    }

    pub fn with_pos(mut self, pos: Option<[f64; 3]>) -> Self {
        self.pos = pos;
        self
    }

    pub fn is_head(&self) -> bool {
        matches!(self.kind, NodeKind::Head)
    }

    pub fn attribute_kind(&self) -> Option<AttributeKind> {
        match self.kind {
            NodeKind::Attribute(kind) => Some(kind),
            NodeKind::Head => None,
        }
    }
}

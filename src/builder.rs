//! Entity Graph Builder: one attribute graph per object entity.
//!
//! ```text
//!              ┌── size ──▶ <Z2> "tiny"
//!   obj2 ──────┼── material ──▶ <M2> "metal"
//!              └── shape ──▶ <S2> "thing"
//! ```

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::{Edge, EdgeKind, Entity, Node, NodeKey, SceneGraph};
use crate::{Error, Result};

/// Builder options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Build directed graphs (head → attribute).
    pub directed: bool,
    /// Label attribute nodes with their kind instead of their value in
    /// [`EntityGraph::labels`].
    pub attr_name_node_label: bool,
    /// Prefix applied to every node key (`Gs` → `Gs-obj`, `Gs-<Z>`).
    pub key_prefix: Option<String>,
}

/// Artifacts of one entity graph.
#[derive(Debug, Clone)]
pub struct EntityGraph {
    pub graph: SceneGraph,
    /// Head node first, then attribute nodes in token order.
    pub nodelist: Vec<Node>,
    /// Display label per node.
    pub labels: HashMap<NodeKey, String>,
    pub edgelist: Vec<Edge>,
    /// `(head, attribute)` → `"{attribute}:{kind}"`.
    pub edge_labels: HashMap<(NodeKey, NodeKey), String>,
}

impl EntityGraph {
    pub fn head(&self) -> &Node {
        &self.nodelist[0]
    }
}

/// Build the graph of the `ent_num`-th (1-based) object entity of a scene.
pub fn build_entity_graph(
    entity: &Arc<Entity>,
    ent_num: usize,
    pos: Option<[f64; 3]>,
    options: &BuilderOptions,
) -> Result<EntityGraph> {
    if !entity.is_object() {
        return Err(Error::InvalidEntity(format!(
            "expected CLEVR_OBJ(S), got {} '{}'",
            entity.label, entity.text
        )));
    }

    let key = |k: NodeKey| match &options.key_prefix {
        Some(prefix) => k.prefixed(prefix),
        None => k,
    };

    let head_key = key(NodeKey::head(ent_num));
    let mut nodelist = vec![Node::head(head_key.clone(), Arc::clone(entity)).with_pos(pos)];
    for token in &entity.tokens {
        let kind = token.kind();
        let attr_key = key(NodeKey::new(kind.node_key(ent_num)));
        if nodelist.iter().any(|n| n.key == attr_key) {
            return Err(Error::InvalidEntity(format!(
                "'{}' has more than one {} token",
                entity.text, kind
            )));
        }
        nodelist.push(Node::attribute(attr_key, kind, token.text.clone()));
    }

    let mut labels = HashMap::with_capacity(nodelist.len());
    for (i, node) in nodelist.iter().enumerate() {
        let label = if i == 0 || options.attr_name_node_label { &node.label } else { &node.val };
        labels.insert(node.key.clone(), label.clone());
    }

    let mut edgelist = Vec::with_capacity(nodelist.len() - 1);
    let mut edge_labels = HashMap::with_capacity(nodelist.len() - 1);
    for node in &nodelist[1..] {
        let Some(kind) = node.attribute_kind() else { continue };
        let edge = Edge::new(head_key.clone(), node.key.clone(), EdgeKind::Attribute(kind), node.val.clone());
        edge_labels.insert((head_key.clone(), node.key.clone()), edge.label());
        edgelist.push(edge);
    }

    let mut graph = if options.directed { SceneGraph::directed() } else { SceneGraph::new() };
    for node in &nodelist {
        graph.add_node(node.clone())?;
    }
    for edge in &edgelist {
        graph.add_edge(edge.clone())?;
    }

    tracing::debug!(
        head = %head_key,
        attributes = nodelist.len() - 1,
        "built entity graph"
    );

    Ok(EntityGraph { graph, nodelist, labels, edgelist, edge_labels })
}

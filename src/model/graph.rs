//! SceneGraph: an insertion-ordered multigraph keyed by [`NodeKey`].

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::{Edge, EdgeKind, Node, NodeKey};
use crate::{Error, Result};

/// Attributed multigraph. Undirected unless built with [`SceneGraph::directed`].
///
/// Nodes keep insertion order; the head node of every entity precedes its
/// attribute nodes, and entities follow enumeration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSceneGraph")]
pub struct SceneGraph {
    directed: bool,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    index: HashMap<NodeKey, usize>,
}

/// Wire form of [`SceneGraph`]; the key index is rebuilt on load.
#[derive(Deserialize)]
struct RawSceneGraph {
    #[serde(default)]
    directed: bool,
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl TryFrom<RawSceneGraph> for SceneGraph {
    type Error = Error;

    fn try_from(raw: RawSceneGraph) -> Result<Self> {
        let mut graph = SceneGraph {
            directed: raw.directed,
            nodes: raw.nodes,
            edges: Vec::new(),
            index: HashMap::new(),
        };
        graph.reindex()?;
        for edge in raw.edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directed() -> Self {
        Self { directed: true, ..Self::default() }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Add a node. Keys are never merged: a second node with the same key
    /// is an error.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.index.contains_key(&node.key) {
            return Err(Error::DuplicateNode(node.key.to_string()));
        }
        self.index.insert(node.key.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn node(&self, key: &NodeKey) -> Option<&Node> {
        self.index.get(key).map(|&i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, key: &NodeKey) -> Option<&mut Node> {
        self.index.get(key).map(|&i| &mut self.nodes[i])
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.index.contains_key(key)
    }

    /// Position of a node in insertion order.
    pub fn position(&self, key: &NodeKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn head_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_head())
    }

    pub fn head_keys(&self) -> Vec<NodeKey> {
        self.head_nodes().map(|n| n.key.clone()).collect()
    }

    pub fn attribute_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.is_head())
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Add an edge. Parallel edges are allowed; both ends must exist.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        for key in [&edge.src, &edge.dst] {
            if !self.contains(key) {
                return Err(Error::NodeNotFound(key.to_string()));
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Any edge between `a` and `b`.
    pub fn has_edge(&self, a: &NodeKey, b: &NodeKey) -> bool {
        self.edges.iter().any(|e| e.joins(a, b, self.directed))
    }

    /// An edge of `kind` between `a` and `b`.
    pub fn has_edge_of_kind(&self, a: &NodeKey, b: &NodeKey, kind: EdgeKind) -> bool {
        self.edges.iter().any(|e| e.kind == kind && e.joins(a, b, self.directed))
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    /// Distinct neighbours of `key` in first-seen edge order. For directed
    /// graphs only successors are returned.
    pub fn neighbors(&self, key: &NodeKey) -> Vec<NodeKey> {
        let mut out: Vec<NodeKey> = Vec::new();
        for edge in &self.edges {
            let other = if edge.src == *key {
                Some(&edge.dst)
            } else if !self.directed && edge.dst == *key {
                Some(&edge.src)
            } else {
                None
            };
            if let Some(other) = other {
                if !out.contains(other) {
                    out.push(other.clone());
                }
            }
        }
        out
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Disjoint union: append every node and edge of `other`.
    pub fn union(&mut self, other: SceneGraph) -> Result<()> {
        if let Some(dup) = other.nodes.iter().find(|n| self.contains(&n.key)) {
            return Err(Error::DuplicateNode(dup.key.to_string()));
        }
        for node in other.nodes {
            self.add_node(node)?;
        }
        self.edges.extend(other.edges);
        Ok(())
    }

    /// Copy of the graph with every node key rewritten as `{prefix}-{key}`.
    pub fn with_prefix(&self, prefix: &str) -> SceneGraph {
        let mut out = SceneGraph { directed: self.directed, ..SceneGraph::default() };
        for node in &self.nodes {
            let mut node = node.clone();
            node.key = node.key.prefixed(prefix);
            out.index.insert(node.key.clone(), out.nodes.len());
            out.nodes.push(node);
        }
        out.edges = self
            .edges
            .iter()
            .map(|e| Edge { src: e.src.prefixed(prefix), dst: e.dst.prefixed(prefix), ..e.clone() })
            .collect();
        out
    }

    fn reindex(&mut self) -> Result<()> {
        self.index.clear();
        for (i, node) in self.nodes.iter().enumerate() {
            if self.index.insert(node.key.clone(), i).is_some() {
                return Err(Error::DuplicateNode(node.key.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeKind;

    fn attr(key: &str, kind: AttributeKind, val: &str) -> Node {
        Node::attribute(key.into(), kind, val)
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut g = SceneGraph::new();
        g.add_node(attr("<C>", AttributeKind::Color, "red")).unwrap();
        let err = g.add_node(attr("<C>", AttributeKind::Color, "blue")).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode(k) if k == "<C>"));
        assert_eq!(g.node(&"<C>".into()).unwrap().val, "red");
    }

    #[test]
    fn test_edge_requires_both_ends() {
        let mut g = SceneGraph::new();
        g.add_node(attr("<C>", AttributeKind::Color, "red")).unwrap();
        let err = g
            .add_edge(Edge::new("<C>".into(), "<S>".into(), EdgeKind::GroundTruth, ""))
            .unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
    }

    #[test]
    fn test_undirected_lookup_is_symmetric() {
        let mut g = SceneGraph::new();
        g.add_node(attr("a", AttributeKind::Color, "red")).unwrap();
        g.add_node(attr("b", AttributeKind::Shape, "cube")).unwrap();
        g.add_edge(Edge::new("a".into(), "b".into(), EdgeKind::SpatialRe, "left")).unwrap();
        assert!(g.has_edge(&"b".into(), &"a".into()));
        assert!(g.has_edge_of_kind(&"b".into(), &"a".into(), EdgeKind::SpatialRe));
        assert!(!g.has_edge_of_kind(&"a".into(), &"b".into(), EdgeKind::MatchingRe));
        assert_eq!(g.neighbors(&"b".into()), vec![NodeKey::from("a")]);
    }

    #[test]
    fn test_directed_lookup() {
        let mut g = SceneGraph::directed();
        g.add_node(attr("a", AttributeKind::Color, "red")).unwrap();
        g.add_node(attr("b", AttributeKind::Shape, "cube")).unwrap();
        g.add_edge(Edge::new("a".into(), "b".into(), EdgeKind::SpatialRe, "left")).unwrap();
        assert!(g.has_edge(&"a".into(), &"b".into()));
        assert!(!g.has_edge(&"b".into(), &"a".into()));
        assert!(g.neighbors(&"b".into()).is_empty());
    }

    #[test]
    fn test_prefix_rewrites_keys_and_edges() {
        let mut g = SceneGraph::new();
        g.add_node(attr("a", AttributeKind::Color, "red")).unwrap();
        g.add_node(attr("b", AttributeKind::Shape, "cube")).unwrap();
        g.add_edge(Edge::new("a".into(), "b".into(), EdgeKind::SpatialRe, "left")).unwrap();
        let p = g.with_prefix("Gs");
        assert!(p.contains(&"Gs-a".into()));
        assert!(p.has_edge(&"Gs-a".into(), &"Gs-b".into()));

        let mut u = g.clone();
        assert!(u.union(g.with_prefix("Gt")).is_ok());
        assert_eq!(u.node_count(), 4);
        assert!(u.union(p.clone()).is_ok());
        assert!(matches!(u.union(p), Err(Error::DuplicateNode(_))));
    }

    #[test]
    fn test_deserialize_rebuilds_index() {
        let mut g = SceneGraph::new();
        g.add_node(attr("a", AttributeKind::Color, "red")).unwrap();
        g.add_node(attr("b", AttributeKind::Shape, "cube")).unwrap();
        g.add_edge(Edge::new("a".into(), "b".into(), EdgeKind::SpatialRe, "left")).unwrap();

        let json = serde_json::to_string(&g).unwrap();
        let mut back: SceneGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node_count(), 2);
        assert_eq!(back.position(&"b".into()), Some(1));
        assert_eq!(back.node(&"a".into()).unwrap().val, "red");
        assert!(back.has_edge(&"b".into(), &"a".into()));
        assert!(matches!(
            back.add_node(attr("a", AttributeKind::Color, "blue")),
            Err(Error::DuplicateNode(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_broken_graphs() {
        let node = serde_json::to_string(&attr("a", AttributeKind::Color, "red")).unwrap();
        let dup = format!(r#"{{"directed":false,"nodes":[{node},{node}],"edges":[]}}"#);
        let err = serde_json::from_str::<SceneGraph>(&dup).unwrap_err();
        assert!(err.to_string().contains("Duplicate node key: a"), "{err}");

        let dangling = format!(
            r#"{{"directed":false,"nodes":[{node}],"edges":[{}]}}"#,
            serde_json::to_string(&Edge::new("a".into(), "z".into(), EdgeKind::SpatialRe, "left")).unwrap()
        );
        assert!(serde_json::from_str::<SceneGraph>(&dangling).is_err());
    }
}

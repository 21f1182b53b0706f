//! Graph export: node-link JSON and COO edge indices.
//!
//! ```text
//! SceneGraph → export_node_link() → {"directed", "multigraph", "nodes", "links"}
//!            → edge_index()       → [[rows...], [cols...]] for GNN loaders
//! ```

use std::collections::BTreeSet;
use std::io::Write;

use serde::Serialize;

use crate::model::SceneGraph;
use crate::{Error, Result};

#[derive(Serialize)]
struct NodeLink<'g> {
    directed: bool,
    multigraph: bool,
    nodes: Vec<NodeEntry<'g>>,
    links: Vec<LinkEntry<'g>>,
}

#[derive(Serialize)]
struct NodeEntry<'g> {
    id: &'g str,
    label: &'g str,
    val: &'g str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pos: Option<[f64; 3]>,
}

#[derive(Serialize)]
struct LinkEntry<'g> {
    source: &'g str,
    target: &'g str,
    key: &'static str,
    value: &'g str,
}

/// Sparse COO adjacency `[rows, cols]` over node insertion order.
///
/// Parallel edges collapse to one entry; undirected graphs list both
/// directions. Entries are sorted by row, then column.
pub fn edge_index(graph: &SceneGraph) -> Result<[Vec<usize>; 2]> {
    let mut pairs = BTreeSet::new();
    for edge in graph.edges() {
        let src = graph
            .position(&edge.src)
            .ok_or_else(|| Error::NodeNotFound(edge.src.to_string()))?;
        let dst = graph
            .position(&edge.dst)
            .ok_or_else(|| Error::NodeNotFound(edge.dst.to_string()))?;
        pairs.insert((src, dst));
        if !graph.is_directed() {
            pairs.insert((dst, src));
        }
    }
    let (rows, cols): (Vec<usize>, Vec<usize>) = pairs.into_iter().unzip();
    Ok([rows, cols])
}

/// Write `graph` as node-link JSON.
pub fn export_node_link(graph: &SceneGraph, writer: &mut dyn Write) -> Result<()> {
    let doc = NodeLink {
        directed: graph.is_directed(),
        multigraph: true,
        nodes: graph
            .nodes()
            .iter()
            .map(|n| NodeEntry { id: n.key.as_str(), label: &n.label, val: &n.val, pos: n.pos })
            .collect(),
        links: graph
            .edges()
            .iter()
            .map(|e| LinkEntry {
                source: e.src.as_str(),
                target: e.dst.as_str(),
                key: e.kind.as_str(),
                value: &e.value,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *writer, &doc)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeKind, Edge, EdgeKind, Node};
    use pretty_assertions::assert_eq;

    fn graph(directed: bool) -> SceneGraph {
        let mut g = if directed { SceneGraph::directed() } else { SceneGraph::new() };
        for (key, kind, val) in [
            ("a", AttributeKind::Color, "red"),
            ("b", AttributeKind::Shape, "cube"),
            ("c", AttributeKind::Size, "small"),
        ] {
            g.add_node(Node::attribute(key.into(), kind, val)).unwrap();
        }
        g.add_edge(Edge::new("a".into(), "b".into(), EdgeKind::SpatialRe, "left")).unwrap();
        g.add_edge(Edge::new("a".into(), "b".into(), EdgeKind::MatchingRe, "size")).unwrap();
        g.add_edge(Edge::new("c".into(), "a".into(), EdgeKind::SpatialRe, "behind")).unwrap();
        g
    }

    #[test]
    fn test_edge_index_undirected() {
        let [rows, cols] = edge_index(&graph(false)).unwrap();
        assert_eq!(rows, vec![0, 0, 1, 2]);
        assert_eq!(cols, vec![1, 2, 0, 0]);
    }

    #[test]
    fn test_edge_index_directed() {
        let [rows, cols] = edge_index(&graph(true)).unwrap();
        assert_eq!(rows, vec![0, 2]);
        assert_eq!(cols, vec![1, 0]);
    }

    #[test]
    fn test_node_link_json() {
        let mut out = Vec::new();
        export_node_link(&graph(false), &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["directed"], false);
        assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(json["nodes"][1]["val"], "cube");
        assert_eq!(json["links"][1]["key"], "matching_re");
        assert!(json["nodes"][0].get("pos").is_none());
    }
}

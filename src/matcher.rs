//! Cross-Modal Matcher: aligns text (source) objects with grounding
//! (target) objects.
//!
//! The matcher is greedy first-fit: source heads are visited in sorted key
//! order and each takes the first sorted target that passes every attribute
//! check. There is no backtracking and no global optimum; callers rely on
//! this ordering.
//!
//! Attribute checks, short-circuiting on the first failure:
//!
//! | Kind | Source unspecified | Source specified |
//! |------|--------------------|------------------|
//! | size | wildcard | annotator compatibility |
//! | color | wildcard | exact text equality |
//! | material | wildcard | annotator compatibility |
//! | shape | wildcard | annotator compatibility |
//!
//! Identical head values match without any attribute check.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::annotator::EntityAnnotator;
use crate::model::{AttributeKind, Edge, EdgeKind, Entity, Node, NodeKey, SceneGraph};
use crate::{Error, Result};

/// Matcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Key prefix of the text-side partition.
    pub source_prefix: String,
    /// Key prefix of the grounding-side partition.
    pub target_prefix: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            source_prefix: "Gs".into(),
            target_prefix: "Gt".into(),
        }
    }
}

/// Unconnected union of a source and a target graph.
#[derive(Debug, Clone)]
pub struct Multimodal {
    pub graph: SceneGraph,
    /// Source partition keys.
    pub ls: Vec<NodeKey>,
    /// Target partition keys.
    pub rs: Vec<NodeKey>,
}

/// Outcome of one matcher run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// `(source head, target head)` pairs.
    pub matched: Vec<(NodeKey, NodeKey)>,
    /// Source heads with no compatible target.
    pub unmatched: Vec<NodeKey>,
}

impl MatchResult {
    /// True when every source head found a target.
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }

    pub fn target_of(&self, source: &NodeKey) -> Option<&NodeKey> {
        self.matched.iter().find(|(s, _)| s == source).map(|(_, t)| t)
    }
}

/// Prefix both graphs and union them into one unconnected graph.
pub fn compose_multimodal(gs: &SceneGraph, gt: &SceneGraph, config: &MatcherConfig) -> Result<Multimodal> {
    let source = gs.with_prefix(&config.source_prefix);
    let target = gt.with_prefix(&config.target_prefix);
    let ls: Vec<NodeKey> = source.nodes().iter().map(|n| n.key.clone()).collect();
    let rs: Vec<NodeKey> = target.nodes().iter().map(|n| n.key.clone()).collect();

    let mut graph = source;
    graph.union(target)?;
    Ok(Multimodal { graph, ls, rs })
}

/// Greedy attribute matcher over two head-node partitions.
pub struct CrossModalMatcher<A> {
    annotator: A,
}

impl<A: EntityAnnotator> CrossModalMatcher<A> {
    pub fn new(annotator: A) -> Self {
        Self { annotator }
    }

    /// Compute the matching without touching the graph.
    pub fn matching_pairs(&self, graph: &SceneGraph, ls: &[NodeKey], rs: &[NodeKey]) -> Result<MatchResult> {
        let sources = sorted_heads(graph, ls)?;
        let targets = sorted_heads(graph, rs)?;
        tracing::debug!(sources = sources.len(), targets = targets.len(), "matching head nodes");

        let mut result = MatchResult::default();
        for source in sources {
            let source_entity = self.resolve_entity(source)?;
            let mut found = None;
            for target in &targets {
                if source.val == target.val {
                    found = Some(*target);
                    break;
                }
                let target_entity = self.resolve_entity(target)?;
                if self.is_compatible(&source_entity, &target_entity) {
                    found = Some(*target);
                    break;
                }
            }
            match found {
                Some(target) => result.matched.push((source.key.clone(), target.key.clone())),
                None => result.unmatched.push(source.key.clone()),
            }
        }

        tracing::info!(
            matched = result.matched.len(),
            unmatched = result.unmatched.len(),
            "matched source heads"
        );
        Ok(result)
    }

    /// Match, then connect every pair and its same-kind attribute nodes with
    /// `<gt>` edges. Existing connections are left alone, so re-running adds
    /// nothing.
    pub fn connect_matching_pairs(&self, graph: &mut SceneGraph, ls: &[NodeKey], rs: &[NodeKey]) -> Result<MatchResult> {
        let result = self.matching_pairs(graph, ls, rs)?;

        for (s_node, t_node) in &result.matched {
            if !graph.has_edge(s_node, t_node) {
                graph.add_edge(Edge::new(s_node.clone(), t_node.clone(), EdgeKind::GroundTruth, ""))?;
            }

            let target_neighbors = graph.neighbors(t_node);
            for ns in graph.neighbors(s_node) {
                // values were already compared; only the kind has to agree
                let Some(kind) = graph.node(&ns).and_then(Node::attribute_kind) else { continue };
                let same_kind: Vec<NodeKey> = target_neighbors
                    .iter()
                    .filter(|nt| graph.node(nt).and_then(Node::attribute_kind) == Some(kind))
                    .cloned()
                    .collect();
                for nt in same_kind {
                    if !graph.has_edge(&ns, &nt) {
                        graph.add_edge(Edge::new(ns.clone(), nt, EdgeKind::GroundTruth, ""))?;
                    }
                }
            }
        }

        Ok(result)
    }

    /// The entity behind a head node: the retained one, or the first object
    /// of a fresh annotation of the node value.
    fn resolve_entity(&self, node: &Node) -> Result<Arc<Entity>> {
        if let Some(entity) = &node.entity {
            return Ok(Arc::clone(entity));
        }
        let doc = self.annotator.annotate(&node.val)?;
        doc.entities
            .into_iter()
            .find(|e| e.is_object())
            .map(Arc::new)
            .ok_or_else(|| Error::InvalidEntity(format!("no object in head value '{}'", node.val)))
    }

    fn is_compatible(&self, source: &Entity, target: &Entity) -> bool {
        AttributeKind::SLOTTED.into_iter().all(|kind| {
            let Some(wanted) = source.attribute_text(kind).filter(|s| !s.is_empty()) else {
                return true;
            };
            let offered = target.attribute_text(kind);
            match kind {
                AttributeKind::Color => offered == Some(wanted),
                _ => self.annotator.attributes_compatible(kind, wanted, offered),
            }
        })
    }
}

/// Head nodes among `keys`, sorted by key.
fn sorted_heads<'g>(graph: &'g SceneGraph, keys: &[NodeKey]) -> Result<Vec<&'g Node>> {
    let mut heads = Vec::new();
    for key in keys {
        let node = graph.node(key).ok_or_else(|| Error::NodeNotFound(key.to_string()))?;
        if node.is_head() {
            heads.push(node);
        }
    }
    heads.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(heads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotator::{AnnotatorConfig, LexiconAnnotator};
    use crate::composer::{compose_scene_graph, ComposeOptions};

    fn annotator() -> LexiconAnnotator {
        LexiconAnnotator::new(42, &AnnotatorConfig::default())
    }

    fn graph(text: &str) -> SceneGraph {
        let doc = annotator().annotate(text).unwrap();
        compose_scene_graph(&doc, &ComposeOptions::default()).unwrap().graph
    }

    #[test]
    fn test_compose_multimodal_partitions() {
        let mm = compose_multimodal(&graph("red cube"), &graph("red cube, blue ball"), &MatcherConfig::default())
            .unwrap();
        assert_eq!(mm.ls.len(), 3);
        assert_eq!(mm.rs.len(), 6);
        assert!(mm.ls.iter().all(|k| k.as_str().starts_with("Gs-")));
        assert!(mm.rs.iter().all(|k| k.as_str().starts_with("Gt-")));
        assert_eq!(mm.graph.node_count(), 9);
    }

    #[test]
    fn test_color_requires_exact_text() {
        let a = annotator();
        let m = CrossModalMatcher::new(&a);
        let mm = compose_multimodal(&graph("grey cube"), &graph("gray cube"), &MatcherConfig::default()).unwrap();
        let result = m.matching_pairs(&mm.graph, &mm.ls, &mm.rs).unwrap();
        assert_eq!(result.unmatched, vec![NodeKey::from("Gs-obj")]);
    }

    #[test]
    fn test_unknown_partition_key() {
        let a = annotator();
        let m = CrossModalMatcher::new(&a);
        let g = graph("red cube");
        let err = m.matching_pairs(&g, &["nope".into()], &[]).unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
    }

    #[test]
    fn test_reannotates_when_entity_not_retained() {
        let a = annotator();
        let m = CrossModalMatcher::new(&a);
        let mut mm = compose_multimodal(&graph("tiny thing"), &graph("large red cube, small cyan sphere"), &MatcherConfig::default())
            .unwrap();
        for key in mm.ls.iter().chain(&mm.rs) {
            if let Some(node) = mm.graph.node_mut(key) {
                node.entity = None;
            }
        }
        let result = m.matching_pairs(&mm.graph, &mm.ls, &mm.rs).unwrap();
        assert_eq!(result.target_of(&"Gs-obj".into()), Some(&NodeKey::from("Gt-obj2")));
    }
}

//! End-to-end tests for cross-modal matching.
//!
//! Each test parses a text graph (source) and a grounding graph (target),
//! composes them and runs the greedy matcher.

use clevr_graph::annotator::AnnotatorConfig;
use clevr_graph::{
    compose_multimodal, AttributeKind, CrossModalMatcher, Document, EdgeKind, EngineConfig,
    EntityAnnotator, LexiconAnnotator, NodeKey, ParseOptions, SceneGraph, SceneParser, SceneRecord,
};
use clevr_graph::matcher::MatcherConfig;
use pretty_assertions::assert_eq;

fn parser() -> SceneParser<LexiconAnnotator> {
    SceneParser::lexicon(EngineConfig::default()).unwrap()
}

fn graph(parser: &SceneParser<LexiconAnnotator>, text: &str) -> SceneGraph {
    parser.parse(text, &ParseOptions::default()).unwrap().into_parsed().unwrap().graph
}

fn key(k: &str) -> NodeKey {
    NodeKey::from(k)
}

/// Lexicon annotations, but no two attribute values are ever compatible.
struct Strict(LexiconAnnotator);

impl EntityAnnotator for Strict {
    fn annotate(&self, text: &str) -> clevr_graph::Result<Document> {
        self.0.annotate(text)
    }

    fn attributes_compatible(&self, _: AttributeKind, _: &str, _: Option<&str>) -> bool {
        false
    }
}

// ============================================================================
// 1. Text graph against a derendered scene
// ============================================================================

#[test]
fn test_match_caption_to_scene() {
    let p = parser();
    let gs = graph(&p, "the tiny metal thing");
    let scene = SceneRecord::from_json(
        r#"{"image_index": 1, "image_filename": "a.png", "objects": [
            {"size": "large", "color": "green", "material": "metal", "shape": "cube", "position": [0, 0, 0]},
            {"size": "small", "color": "gray", "material": "metal", "shape": "sphere", "position": [1, 1, 0]}
        ]}"#,
    )
    .unwrap();
    let gt = p.parse_scene(&scene).unwrap().into_parsed().unwrap().graph;

    let (mm, result) = p.match_graphs(&gs, &gt).unwrap();
    assert_eq!(result.matched, vec![(key("Gs-obj"), key("Gt-obj2"))]);
    assert!(result.is_complete());

    let gt_edges: Vec<(&str, &str)> = mm
        .graph
        .edges_of_kind(EdgeKind::GroundTruth)
        .map(|e| (e.src.as_str(), e.dst.as_str()))
        .collect();
    assert_eq!(gt_edges, vec![
        ("Gs-obj", "Gt-obj2"),
        ("Gs-<Z>", "Gt-<Z2>"),
        ("Gs-<M>", "Gt-<M2>"),
        ("Gs-<S>", "Gt-<S2>"),
    ]);
}

// ============================================================================
// 2. Connecting is idempotent
// ============================================================================

#[test]
fn test_connect_twice_adds_nothing() {
    let p = parser();
    let gs = graph(&p, "a red cube");
    let gt = graph(&p, "large red rubber cube, small blue metal sphere");
    let (mut mm, first) = p.match_graphs(&gs, &gt).unwrap();
    let edges = mm.graph.edge_count();

    let second = p.matcher().connect_matching_pairs(&mut mm.graph, &mm.ls, &mm.rs).unwrap();
    assert_eq!(first, second);
    assert_eq!(mm.graph.edge_count(), edges);
}

// ============================================================================
// 3. Unmatched sources are data, not errors
// ============================================================================

#[test]
fn test_unmatched_source() {
    let p = parser();
    let gs = graph(&p, "a purple cylinder, a red cube");
    let gt = graph(&p, "large red rubber cube");
    let (mm, result) = p.match_graphs(&gs, &gt).unwrap();

    assert_eq!(result.unmatched, vec![key("Gs-obj")]);
    assert_eq!(result.target_of(&key("Gs-obj2")), Some(&key("Gt-obj")));
    assert!(!result.is_complete());
    assert!(!mm.graph.has_edge(&key("Gs-obj"), &key("Gt-obj")));
}

// ============================================================================
// 4. Greedy first fit and wildcards
// ============================================================================

#[test]
fn test_wildcard_source_takes_first_target() {
    let p = parser();
    let gs = graph(&p, "the thing, the sphere");
    let gt = graph(&p, "small red cube, large blue sphere, small blue sphere");
    let (_, result) = p.match_graphs(&gs, &gt).unwrap();
    assert_eq!(result.matched, vec![
        (key("Gs-obj"), key("Gt-obj")),
        (key("Gs-obj2"), key("Gt-obj2")),
    ]);
}

#[test]
fn test_targets_are_not_consumed() {
    let p = parser();
    let gs = graph(&p, "a cube, a red thing");
    let gt = graph(&p, "small red cube");
    let (_, result) = p.match_graphs(&gs, &gt).unwrap();
    assert_eq!(result.matched, vec![
        (key("Gs-obj"), key("Gt-obj")),
        (key("Gs-obj2"), key("Gt-obj")),
    ]);
}

// ============================================================================
// 5. Exact value equality bypasses attribute checks
// ============================================================================

#[test]
fn test_exact_value_forces_match() {
    let lexicon = LexiconAnnotator::new(42, &AnnotatorConfig::default());
    let p = parser();
    let gs = graph(&p, "small red cube");
    let gt = graph(&p, "large red cube, small red cube");

    let mm = compose_multimodal(&gs, &gt, &MatcherConfig::default()).unwrap();
    let strict = CrossModalMatcher::new(Strict(lexicon));
    let result = strict.matching_pairs(&mm.graph, &mm.ls, &mm.rs).unwrap();
    assert_eq!(result.matched, vec![(key("Gs-obj"), key("Gt-obj2"))]);
}

#[test]
fn test_custom_partition_prefixes() {
    let config = EngineConfig {
        matcher: MatcherConfig { source_prefix: "text".into(), target_prefix: "img".into() },
        ..EngineConfig::default()
    };
    let p = SceneParser::lexicon(config).unwrap();
    let gs = graph(&p, "a blue sphere");
    let gt = graph(&p, "small blue rubber sphere");
    let (mm, result) = p.match_graphs(&gs, &gt).unwrap();
    assert_eq!(result.matched, vec![(key("text-obj"), key("img-obj"))]);
    assert!(mm.graph.contains(&key("img-<M>")));
}

//! # clevr-graph: CLEVR scene graphs for cross-modal matching
//!
//! Turns captions, questions and derendered image scenes of CLEVR worlds
//! into attributed multigraphs, aligns text graphs with grounding graphs,
//! and assembles fixed-width features for graph learning.
//!
//! ## Design Principles
//!
//! 1. **Annotator as a seam**: `EntityAnnotator` is the contract between NLP and graph building
//! 2. **Plain data**: `Entity`, `Node`, `Edge`, `SceneGraph` cross all boundaries
//! 3. **Explicit config**: seed and options live in `EngineConfig`, injected at construction
//! 4. **Best-effort relations**: unresolvable relation spans are logged and skipped, never fatal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clevr_graph::{EngineConfig, ParseOptions, SceneParser};
//!
//! # fn example() -> clevr_graph::Result<()> {
//! let parser = SceneParser::lexicon(EngineConfig::load()?)?;
//! let outcome = parser.parse(
//!     "There is a green metal block; the tiny metal thing is to the left of it",
//!     &ParseOptions::default(),
//! )?;
//!
//! if let Some(scene) = outcome.parsed() {
//!     for node in scene.graph.nodes() {
//!         println!("{} {} {}", node.key, node.label, node.val);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Annotate | [`annotator`] | `Document` of entity spans |
//! | Build | [`builder`] | one `EntityGraph` per object |
//! | Compose | [`composer`] | disjoint union `SceneGraph` |
//! | Link | [`relation`] | `spatial_re` / `matching_re` head edges |
//! | Match | [`matcher`] | `<gt>` edges between text and grounding graphs |
//! | Embed | [`embedding`] | `ndarray` feature matrices |

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::Array2;

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod annotator;
pub mod builder;
pub mod composer;
pub mod relation;
pub mod matcher;
pub mod embedding;
pub mod scene;
pub mod export;
pub mod config;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    AttributeKind, Document, Edge, EdgeKind, Entity, EntityLabel,
    Node, NodeKey, NodeKind, SceneGraph, Token, TokenFlags,
};

// ============================================================================
// Re-exports: Components
// ============================================================================

pub use annotator::{EntityAnnotator, LexiconAnnotator};
pub use builder::{build_entity_graph, BuilderOptions, EntityGraph};
pub use composer::{compose_scene_graph, ComposeOptions, ComposedScene};
pub use config::EngineConfig;
pub use embedding::{EmbeddingAssembler, EmbeddingConfig};
pub use matcher::{compose_multimodal, CrossModalMatcher, MatchResult, Multimodal};
pub use relation::{RelationKind, RelationLinker, RelationVocabulary};
pub use scene::{SceneObject, SceneRecord};

use composer::MAX_SCENE_OBJECTS;

// ============================================================================
// Top-level SceneParser handle
// ============================================================================

/// Per-call parse options.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Image index, echoed in skip sentinels.
    pub index: usize,
    /// Image filename, echoed in skip sentinels.
    pub filename: String,
    /// One position per object entity, for grounding graphs.
    pub pos: Option<Vec<[f64; 3]>>,
}

/// A successfully parsed scene.
#[derive(Debug, Clone)]
pub struct ParsedScene {
    pub graph: SceneGraph,
    pub document: Document,
    /// Object number (1-based) → entity graph artifacts.
    pub entity_graphs: BTreeMap<usize, EntityGraph>,
}

/// Result of a parse: a scene, or a sentinel telling batch pipelines to skip
/// the record.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Parsed(ParsedScene),
    Skip(String),
}

impl ParseOutcome {
    pub fn parsed(&self) -> Option<&ParsedScene> {
        match self {
            ParseOutcome::Parsed(scene) => Some(scene),
            ParseOutcome::Skip(_) => None,
        }
    }

    pub fn into_parsed(self) -> Option<ParsedScene> {
        match self {
            ParseOutcome::Parsed(scene) => Some(scene),
            ParseOutcome::Skip(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            ParseOutcome::Skip(reason) => Some(reason),
            ParseOutcome::Parsed(_) => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, ParseOutcome::Skip(_))
    }
}

/// Document vector of a text, or a skip sentinel.
#[derive(Debug, Clone)]
pub enum TextEmbedding {
    Embedded { graph: SceneGraph, vector: Array2<f32> },
    Skip(String),
}

/// The primary entry point. A `SceneParser` wraps an annotator and runs the
/// annotate → compose → link pipeline with the components configured by
/// [`EngineConfig`].
pub struct SceneParser<A: EntityAnnotator> {
    annotator: Arc<A>,
    config: EngineConfig,
    linker: RelationLinker,
    matcher: CrossModalMatcher<Arc<A>>,
    assembler: EmbeddingAssembler,
}

impl<A: EntityAnnotator> SceneParser<A> {
    /// Create a parser around `annotator`. Rejects configs whose token
    /// width does not fit the embedding slots, then loads the relation
    /// vocabulary file when one is configured.
    pub fn new(annotator: A, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let vocabulary = match &config.relations.vocabulary_path {
            Some(path) => RelationVocabulary::from_path(path)?,
            None => RelationVocabulary::default(),
        };
        let annotator = Arc::new(annotator);
        Ok(Self {
            matcher: CrossModalMatcher::new(Arc::clone(&annotator)),
            linker: RelationLinker::new(vocabulary),
            assembler: EmbeddingAssembler::new(config.embedding.clone()),
            annotator,
            config,
        })
    }

    /// Annotate, compose and link one text.
    pub fn parse(&self, text: &str, options: &ParseOptions) -> Result<ParseOutcome> {
        let document = self.annotator.annotate(text)?;
        let parser = &self.config.parser;

        if parser.skip_plurals && document.has_plurals() {
            tracing::info!(text, "plural object span, skipping");
            return Ok(ParseOutcome::Skip(format!("SKIP_img {}_{}", options.index, options.filename)));
        }

        let compose = ComposeOptions {
            builder: self.config.builder.clone(),
            pos: options.pos.clone(),
            cap_to_10_objs: parser.cap_to_10_objs,
        };
        let ComposedScene { mut graph, entity_graphs } = compose_scene_graph(&document, &compose)?;

        if parser.has_spatial && document.with_label(EntityLabel::SpatialRe).next().is_some() {
            self.linker.link_spatial(&mut graph, &document)?;
        }
        if parser.has_matching && document.with_label(EntityLabel::MatchingRe).next().is_some() {
            self.linker.link_matching(&mut graph, &document)?;
        }

        Ok(ParseOutcome::Parsed(ParsedScene { graph, document, entity_graphs }))
    }

    /// Parse the skeletal caption of a derendered scene, attaching object
    /// positions to the head nodes.
    pub fn parse_scene(&self, scene: &SceneRecord) -> Result<ParseOutcome> {
        if self.config.parser.cap_to_10_objs {
            scene.check_object_cap()?;
        }
        let Some(caption) = scene.caption() else {
            tracing::warn!(
                index = scene.image_index,
                filename = %scene.image_filename,
                "derenderer produced no objects, skipping scene"
            );
            return Ok(ParseOutcome::Skip(scene.skip_sentinel()));
        };

        let options = ParseOptions {
            index: scene.image_index,
            filename: scene.image_filename.clone(),
            pos: Some(scene.positions()),
        };
        self.parse(&caption, &options)
    }

    /// Parse `text` and assemble its document vector.
    pub fn text_embedding(&self, text: &str) -> Result<TextEmbedding> {
        match self.parse(text, &ParseOptions::default())? {
            ParseOutcome::Parsed(scene) => {
                let vector = self.assembler.doc_vector(&scene.document)?;
                Ok(TextEmbedding::Embedded { graph: scene.graph, vector })
            }
            ParseOutcome::Skip(_) => Ok(TextEmbedding::Skip(format!("SKIP_{text}"))),
        }
    }

    /// Re-annotate the value of every `CLEVR_OBJ` head node, one document
    /// per head. `None` when the graph has no such node.
    pub fn docs_from_graph(&self, graph: &SceneGraph) -> Result<Option<Vec<Document>>> {
        let spans: Vec<&str> = graph
            .head_nodes()
            .filter(|n| n.label == EntityLabel::ClevrObj.as_str())
            .map(|n| n.val.as_str())
            .collect();
        if spans.len() > MAX_SCENE_OBJECTS {
            return Err(Error::TooManyObjects { count: spans.len(), max: MAX_SCENE_OBJECTS });
        }
        if spans.is_empty() {
            tracing::warn!("no CLEVR_OBJ head nodes in graph");
            return Ok(None);
        }
        spans.into_iter().map(|s| self.annotator.annotate(s)).collect::<Result<Vec<_>>>().map(Some)
    }

    /// Union a text graph with a grounding graph and connect matching objects.
    pub fn match_graphs(&self, gs: &SceneGraph, gt: &SceneGraph) -> Result<(Multimodal, MatchResult)> {
        let mut multimodal = compose_multimodal(gs, gt, &self.config.matcher)?;
        let result = self.matcher.connect_matching_pairs(&mut multimodal.graph, &multimodal.ls, &multimodal.rs)?;
        Ok((multimodal, result))
    }

    pub fn annotator(&self) -> &A {
        &self.annotator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn linker(&self) -> &RelationLinker {
        &self.linker
    }

    pub fn matcher(&self) -> &CrossModalMatcher<Arc<A>> {
        &self.matcher
    }

    pub fn assembler(&self) -> &EmbeddingAssembler {
        &self.assembler
    }
}

/// Parser backed by the built-in lexicon annotator.
impl SceneParser<LexiconAnnotator> {
    pub fn lexicon(config: EngineConfig) -> Result<Self> {
        let annotator = LexiconAnnotator::from_config(&config)?;
        Self::new(annotator, config)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No object entities in '{0}'")]
    NoObjects(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("Position mismatch: {positions} positions for {objects} objects")]
    PositionMismatch { positions: usize, objects: usize },

    #[error("Too many objects: {count} (max {max})")]
    TooManyObjects { count: usize, max: usize },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Duplicate node key: {0}")]
    DuplicateNode(String),

    #[error("Shape error: expected {expected:?}, got {got:?}")]
    Shape { expected: (usize, usize), got: (usize, usize) },

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(Box<figment::Error>),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

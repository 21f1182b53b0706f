//! Engine configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults (`EngineConfig::default()`)
//! 2. An optional TOML file
//! 3. Environment variables: `CLEVR_GRAPH_*`, nested keys split on `__`
//!
//! ```toml
//! seed = 42
//!
//! [parser]
//! has_spatial = true
//! has_matching = true
//!
//! [embedding]
//! entity_vector_size = 384
//! attr_vec_size = 96
//! include_obj_node = true
//! ```
//!
//! The config is built once at startup and injected into the components
//! that need it; nothing reads it implicitly.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::annotator::AnnotatorConfig;
use crate::builder::BuilderOptions;
use crate::embedding::EmbeddingConfig;
use crate::matcher::MatcherConfig;
use crate::{Error, Result};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CLEVR_GRAPH_";

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for every pseudo-random choice (token vectors of the lexicon
    /// annotator). Same seed, same output.
    pub seed: u64,
    pub annotator: AnnotatorConfig,
    pub parser: ParserConfig,
    pub builder: BuilderOptions,
    pub embedding: EmbeddingConfig,
    pub matcher: MatcherConfig,
    pub relations: RelationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            annotator: AnnotatorConfig::default(),
            parser: ParserConfig::default(),
            builder: BuilderOptions::default(),
            embedding: EmbeddingConfig::default(),
            matcher: MatcherConfig::default(),
            relations: RelationConfig::default(),
        }
    }
}

/// Options for [`SceneParser::parse`](crate::SceneParser::parse).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Link spatial relation spans (`left of`, `behind`).
    pub has_spatial: bool,
    /// Link matching relation spans (`same size as`).
    pub has_matching: bool,
    /// Return a skip sentinel for documents with plural object spans.
    pub skip_plurals: bool,
    /// Reject scenes with more than 10 objects.
    pub cap_to_10_objs: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            has_spatial: true,
            has_matching: true,
            skip_plurals: false,
            cap_to_10_objs: false,
        }
    }
}

/// Relation vocabulary source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    /// Newline-delimited spatial relation terms. Built-in terms when unset.
    pub vocabulary_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Defaults overridden by `CLEVR_GRAPH_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::figment(None).extract::<Self>().map_err(Error::from)
    }

    /// Defaults, then the TOML file at `path`, then the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::figment(Some(path.as_ref())).extract::<Self>().map_err(Error::from)
    }

    /// Check that the token width the annotator produces fits the embedding
    /// slots: `entity_vector_size / 4` and `attr_vec_size` must both equal
    /// `annotator.vector_width`.
    pub fn validate(&self) -> Result<()> {
        let width = self.annotator.vector_width;
        let embedding = &self.embedding;
        if embedding.entity_vector_size % 4 != 0 || embedding.entity_vector_size / 4 != width {
            return Err(Error::Invariant(format!(
                "entity_vector_size {} does not hold four {width}-wide token slots",
                embedding.entity_vector_size
            )));
        }
        if embedding.attr_vec_size != width {
            return Err(Error::Invariant(format!(
                "attr_vec_size {} differs from token width {width}",
                embedding.attr_vec_size
            )));
        }
        Ok(())
    }

    /// The layered provider chain, exposed so callers can merge more layers.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

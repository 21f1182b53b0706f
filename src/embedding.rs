//! Embedding Assembler: fixed-width feature vectors and matrices.
//!
//! An entity vector has one slot per attribute kind, in position order:
//!
//! ```text
//! include_obj_node = false:  [ Z | C | M | S ]
//! include_obj_node = true:   [ Z | C | M | S | Z | C | M | S ]
//! ```
//!
//! Kinds the entity does not mention stay zero, so every entity vector has
//! the same width no matter how many attributes it names. Unknown tokens
//! have no slot.

use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis, ShapeError};
use serde::{Deserialize, Serialize};

use crate::model::{Document, Entity, EntityLabel, SceneGraph, Token};
use crate::{Error, Result};

/// Embedding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Width of one entity vector, four slots.
    pub entity_vector_size: usize,
    /// Row width of entity matrices and graph features.
    pub attr_vec_size: usize,
    /// Tile each entity vector to stand in for its head node.
    pub include_obj_node: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            entity_vector_size: 384,
            attr_vec_size: 96,
            include_obj_node: true,
        }
    }
}

/// Builds numeric features from annotated entities.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingAssembler {
    config: EmbeddingConfig,
}

impl EmbeddingAssembler {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Slot width inside an entity vector.
    pub fn token_size(&self) -> usize {
        self.config.entity_vector_size / 4
    }

    /// Width of one entity vector after optional tiling.
    pub fn entity_width(&self) -> usize {
        if self.config.include_obj_node {
            self.config.entity_vector_size * 2
        } else {
            self.config.entity_vector_size
        }
    }

    /// The token vector as a `1×size` row.
    pub fn token_vector(&self, token: &Token, size: usize) -> Result<Array2<f32>> {
        if token.vector.len() != size {
            return Err(Error::Shape { expected: (1, size), got: (1, token.vector.len()) });
        }
        Ok(Array1::from(token.vector.clone()).insert_axis(Axis(0)))
    }

    /// Fixed-width `1×entity_width()` vector of one object entity.
    pub fn entity_vector(&self, entity: &Entity) -> Result<Array2<f32>> {
        ensure_object(entity)?;
        let ts = self.token_size();
        let mut vector = Array2::<f32>::zeros((1, self.config.entity_vector_size));
        for token in &entity.tokens {
            let Some(slot) = token.kind().slot() else { continue };
            let row = self.token_vector(token, ts)?;
            vector.slice_mut(s![.., slot * ts..(slot + 1) * ts]).assign(&row);
        }

        if self.config.include_obj_node {
            let tiled = concatenate(Axis(1), &[vector.view(), vector.view()]).map_err(shape_error)?;
            return Ok(tiled);
        }
        Ok(vector)
    }

    /// `(k+1)×attr_vec_size` matrix of an entity with `k` tokens: the head
    /// row (mean of the token rows) followed by the token rows in position
    /// order.
    pub fn entity_matrix(&self, entity: &Entity) -> Result<Array2<f32>> {
        ensure_object(entity)?;
        let dim = self.config.attr_vec_size;
        let mut tokens: Vec<&Token> = entity.tokens.iter().collect();
        tokens.sort_by_key(|t| t.kind().position());

        let mut matrix = Array2::<f32>::zeros((tokens.len() + 1, dim));
        for (i, token) in tokens.iter().enumerate() {
            let row = self.token_vector(token, dim)?;
            matrix.row_mut(i + 1).assign(&row.row(0));
        }
        let head = matrix
            .slice(s![1.., ..])
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::InvalidEntity(format!("'{}' has no tokens", entity.text)))?;
        matrix.row_mut(0).assign(&head);
        Ok(matrix)
    }

    /// All object entity vectors of `doc`, side by side.
    pub fn doc_vector(&self, doc: &Document) -> Result<Array2<f32>> {
        let vectors = doc.objects().map(|e| self.entity_vector(e)).collect::<Result<Vec<_>>>()?;
        if vectors.is_empty() {
            return Err(Error::NoObjects(doc.text.clone()));
        }

        let views: Vec<ArrayView2<'_, f32>> = vectors.iter().map(|v| v.view()).collect();
        let out = concatenate(Axis(1), &views).map_err(shape_error)?;

        let expected = (1, vectors.len() * self.entity_width());
        if out.dim() != expected {
            return Err(Error::Shape { expected, got: out.dim() });
        }
        Ok(out)
    }

    /// Node feature matrix of `graph`: one `attr_vec_size`-wide row per node,
    /// entity by entity, followed by one row per spatial and then per matching
    /// relation entity of `doc`.
    pub fn graph_features(&self, graph: &SceneGraph, doc: &Document) -> Result<Array2<f32>> {
        let dim = self.config.attr_vec_size;
        let mut blocks = doc.objects().map(|e| self.entity_matrix(e)).collect::<Result<Vec<_>>>()?;
        if blocks.is_empty() {
            return Err(Error::NoObjects(doc.text.clone()));
        }

        let node_rows: usize = blocks.iter().map(|b| b.nrows()).sum();
        if node_rows != graph.node_count() {
            return Err(Error::Shape { expected: (graph.node_count(), dim), got: (node_rows, dim) });
        }

        let relations = doc
            .with_label(EntityLabel::SpatialRe)
            .chain(doc.with_label(EntityLabel::MatchingRe));
        for entity in relations {
            let vector = entity.vector();
            if vector.len() != dim {
                return Err(Error::Shape { expected: (1, dim), got: (1, vector.len()) });
            }
            blocks.push(Array1::from(vector).insert_axis(Axis(0)));
        }

        let views: Vec<ArrayView2<'_, f32>> = blocks.iter().map(|b| b.view()).collect();
        let features = concatenate(Axis(0), &views).map_err(shape_error)?;
        tracing::debug!(rows = features.nrows(), cols = features.ncols(), "assembled graph features");
        Ok(features)
    }
}

fn ensure_object(entity: &Entity) -> Result<()> {
    if entity.is_object() {
        Ok(())
    } else {
        Err(Error::InvalidEntity(format!(
            "expected CLEVR_OBJ(S), got {} '{}'",
            entity.label, entity.text
        )))
    }
}

fn shape_error(err: ShapeError) -> Error {
    Error::Invariant(format!("array stacking failed: {err}"))
}

//! # Entity Annotator
//!
//! The contract between the graph engine and whatever recognizes CLEVR
//! objects and relations in text. The engine only needs:
//!
//! - `annotate(text)` → a [`Document`] with entity spans in text order, each
//!   token carrying attribute flags and a fixed-width vector;
//! - `attributes_compatible(kind, source, target)` → the paraphrase-tolerant
//!   equality used by the cross-modal matcher.
//!
//! ## Implementations
//!
//! | Annotator | Module | Description |
//! |-----------|--------|-------------|
//! | `LexiconAnnotator` | `lexicon` | CLEVR vocabulary + seeded word vectors |

pub mod lexicon;
pub mod tokenizer;

use serde::{Deserialize, Serialize};

use crate::model::{AttributeKind, Document};
use crate::Result;

pub use lexicon::LexiconAnnotator;

/// Annotator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Width of every token vector.
    pub vector_width: usize,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self { vector_width: 96 }
    }
}

/// Recognizes object and relation entities in text.
///
/// Implementations must be deterministic: the same text yields the same
/// entities, tokens and vectors.
pub trait EntityAnnotator: Send + Sync {
    /// Annotate a caption or question.
    fn annotate(&self, text: &str) -> Result<Document>;

    /// Whether a source attribute value is compatible with a target value.
    ///
    /// `target` is `None` when the target entity has no token of `kind`.
    fn attributes_compatible(&self, kind: AttributeKind, source: &str, target: Option<&str>) -> bool;
}

impl<A: EntityAnnotator + ?Sized> EntityAnnotator for &A {
    fn annotate(&self, text: &str) -> Result<Document> {
        (**self).annotate(text)
    }

    fn attributes_compatible(&self, kind: AttributeKind, source: &str, target: Option<&str>) -> bool {
        (**self).attributes_compatible(kind, source, target)
    }
}

impl<A: EntityAnnotator + ?Sized> EntityAnnotator for std::sync::Arc<A> {
    fn annotate(&self, text: &str) -> Result<Document> {
        (**self).annotate(text)
    }

    fn attributes_compatible(&self, kind: AttributeKind, source: &str, target: Option<&str>) -> bool {
        (**self).attributes_compatible(kind, source, target)
    }
}

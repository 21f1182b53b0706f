//! Annotated documents: entities, tokens and their labels.
//!
//! These are produced by an [`EntityAnnotator`](crate::annotator::EntityAnnotator)
//! and never mutated by the graph engine.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{AttributeKind, TokenFlags};

/// Entity span label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityLabel {
    #[serde(rename = "CLEVR_OBJ")]
    ClevrObj,
    /// Plural object span ("the red cubes").
    #[serde(rename = "CLEVR_OBJS")]
    ClevrObjs,
    #[serde(rename = "SPATIAL_RE")]
    SpatialRe,
    #[serde(rename = "MATCHING_RE")]
    MatchingRe,
}

impl EntityLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityLabel::ClevrObj => "CLEVR_OBJ",
            EntityLabel::ClevrObjs => "CLEVR_OBJS",
            EntityLabel::SpatialRe => "SPATIAL_RE",
            EntityLabel::MatchingRe => "MATCHING_RE",
        }
    }

    pub fn is_object(self) -> bool {
        matches!(self, EntityLabel::ClevrObj | EntityLabel::ClevrObjs)
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One token of an entity span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub flags: TokenFlags,
    pub vector: Vec<f32>,
}

impl Token {
    pub fn new(text: impl Into<String>, flags: TokenFlags, vector: Vec<f32>) -> Self {
        Self { text: text.into(), flags, vector }
    }

    /// Classified attribute kind of this token.
    pub fn kind(&self) -> AttributeKind {
        AttributeKind::classify(self.flags)
    }
}

/// An annotated span of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub label: EntityLabel,
    pub text: String,
    /// Byte offset of the span start in [`Document::text`].
    pub start: usize,
    /// Byte offset one past the span end.
    pub end: usize,
    pub tokens: SmallVec<[Token; 4]>,
}

impl Entity {
    pub fn is_object(&self) -> bool {
        self.label.is_object()
    }

    /// First token classified as `kind`.
    pub fn attribute(&self, kind: AttributeKind) -> Option<&Token> {
        self.tokens.iter().find(|t| t.kind() == kind)
    }

    /// Text of the first token classified as `kind`.
    pub fn attribute_text(&self, kind: AttributeKind) -> Option<&str> {
        self.attribute(kind).map(|t| t.text.as_str())
    }

    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attribute(kind).is_some()
    }

    /// Span vector: the mean of the token vectors. Empty for an empty span.
    pub fn vector(&self) -> Vec<f32> {
        let Some(first) = self.tokens.first() else {
            return Vec::new();
        };
        let mut acc = vec![0.0f32; first.vector.len()];
        for token in &self.tokens {
            for (a, v) in acc.iter_mut().zip(&token.vector) {
                *a += *v;
            }
        }
        let n = self.tokens.len() as f32;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }
}

/// An annotated document: full text plus entities in text order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub entities: Vec<Entity>,
}

impl Document {
    pub fn objects(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_object())
    }

    pub fn with_label(&self, label: EntityLabel) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.label == label)
    }

    pub fn object_count(&self) -> usize {
        self.objects().count()
    }

    /// True if any object span is plural.
    pub fn has_plurals(&self) -> bool {
        self.entities.iter().any(|e| e.label == EntityLabel::ClevrObjs)
    }

    /// True if `word` occurs in the text as a whole word (ASCII case-insensitive).
    pub fn contains_word(&self, word: &str) -> bool {
        self.text
            .split(|c: char| !c.is_alphanumeric())
            .any(|w| w.eq_ignore_ascii_case(word))
    }

    /// Text following the given entity, up to the end of the document.
    pub fn text_after(&self, entity: &Entity) -> &str {
        self.text.get(entity.end..).unwrap_or("")
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn entity(tokens: SmallVec<[Token; 4]>) -> Entity {
        Entity { label: EntityLabel::ClevrObj, text: String::new(), start: 0, end: 0, tokens }
    }

    #[test]
    fn test_entity_vector_is_token_mean() {
        let e = entity(smallvec![
            Token::new("red", TokenFlags::color(), vec![1.0, 3.0]),
            Token::new("cube", TokenFlags::shape(), vec![3.0, 5.0]),
        ]);
        assert_eq!(e.vector(), vec![2.0, 4.0]);
        assert_eq!(e.attribute_text(AttributeKind::Shape), Some("cube"));
        assert!(!e.has_attribute(AttributeKind::Size));
    }

    #[test]
    fn test_contains_word_is_whole_word() {
        let doc = Document { text: "a sand colored cube".into(), entities: vec![] };
        assert!(!doc.contains_word("and"));
        let doc = Document { text: "a cube and, a ball".into(), entities: vec![] };
        assert!(doc.contains_word("and"));
    }
}

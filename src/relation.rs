//! Relation Linker: head-to-head edges for spatial and matching relations.
//!
//! Each relation entity is attached to two object entities by position in
//! the document's entity sequence, not in the graph:
//!
//! ```text
//! ents:  [obj A] [SPATIAL_RE] [obj B]          → A -[spatial_re]- B
//! ents:  [obj A] [obj B] "and" [REL] [obj C]   → A -[rel]- C   (i > 1, conjunction)
//! ents:  [obj A] [obj B] [REL] "it"            → B -[rel]- A   (anaphora)
//! ```
//!
//! The heuristic is best effort. A relation whose neighbours cannot be
//! resolved is logged and skipped; it never fails the parse.

use std::path::Path;

use crate::model::{Document, Edge, EdgeKind, Entity, EntityLabel, NodeKey, SceneGraph, Token};
use crate::{Error, Result};

/// Relation words of `MATCHING_RE` spans.
pub const MATCHING_RELATIONS: &[&str] = &["size", "color", "material", "shape"];

const DEFAULT_SPATIAL_RELATIONS: &str = include_str!("../data/relation-attrs.txt");

/// Pronouns that refer back to an already mentioned object.
const ANAPHORS: &[&str] = &["it"];

/// Which relation family to link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Spatial,
    Matching,
}

impl RelationKind {
    pub fn entity_label(self) -> EntityLabel {
        match self {
            RelationKind::Spatial => EntityLabel::SpatialRe,
            RelationKind::Matching => EntityLabel::MatchingRe,
        }
    }

    pub fn edge_kind(self) -> EdgeKind {
        match self {
            RelationKind::Spatial => EdgeKind::SpatialRe,
            RelationKind::Matching => EdgeKind::MatchingRe,
        }
    }
}

// ============================================================================
// Vocabulary
// ============================================================================

/// Spatial relation terms, one per line in the resource file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationVocabulary {
    terms: Vec<String>,
}

impl RelationVocabulary {
    /// Parse newline-delimited terms. Lines are trimmed and lowercased; blank
    /// lines and duplicates are ignored.
    pub fn parse(source: &str) -> Self {
        let mut terms: Vec<String> = Vec::new();
        for line in source.lines() {
            let term = line.trim().to_ascii_lowercase();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
        Self { terms }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&source))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.terms.iter().any(|t| t.eq_ignore_ascii_case(word))
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

impl Default for RelationVocabulary {
    fn default() -> Self {
        Self::parse(DEFAULT_SPATIAL_RELATIONS)
    }
}

// ============================================================================
// Linker
// ============================================================================

/// Why a relation could not be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Unresolved {
    NoRelationToken,
    OutOfRange(isize),
    NotAnObject(usize),
}

impl std::fmt::Display for Unresolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unresolved::NoRelationToken => write!(f, "no relation term in span"),
            Unresolved::OutOfRange(i) => write!(f, "neighbour index {i} out of range"),
            Unresolved::NotAnObject(i) => write!(f, "neighbour {i} is not an object entity"),
        }
    }
}

/// Inserts relation edges between head nodes.
#[derive(Debug, Clone, Default)]
pub struct RelationLinker {
    spatial: RelationVocabulary,
}

impl RelationLinker {
    pub fn new(spatial: RelationVocabulary) -> Self {
        Self { spatial }
    }

    pub fn vocabulary(&self) -> &RelationVocabulary {
        &self.spatial
    }

    pub fn link_spatial(&self, graph: &mut SceneGraph, doc: &Document) -> Result<usize> {
        self.link(graph, doc, RelationKind::Spatial)
    }

    pub fn link_matching(&self, graph: &mut SceneGraph, doc: &Document) -> Result<usize> {
        self.link(graph, doc, RelationKind::Matching)
    }

    /// The relation term of one relation entity: its first token found in
    /// the vocabulary of `kind`.
    pub fn relation_token<'e>(&self, entity: &'e Entity, kind: RelationKind) -> Option<&'e Token> {
        entity.tokens.iter().find(|t| match kind {
            RelationKind::Spatial => self.spatial.contains(&t.text),
            RelationKind::Matching => MATCHING_RELATIONS.iter().any(|m| m.eq_ignore_ascii_case(&t.text)),
        })
    }

    /// `(document index, relation token)` for every relation entity of `kind`
    /// that carries a relation term.
    pub fn extract_relations<'d>(&self, doc: &'d Document, kind: RelationKind) -> Vec<(usize, &'d Token)> {
        doc.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.label == kind.entity_label())
            .filter_map(|(i, e)| self.relation_token(e, kind).map(|t| (i, t)))
            .collect()
    }

    /// Insert one edge per resolvable relation entity of `kind`.
    ///
    /// Returns the number of edges inserted. An edge of the same kind already
    /// joining the pair is never duplicated.
    pub fn link(&self, graph: &mut SceneGraph, doc: &Document, kind: RelationKind) -> Result<usize> {
        let label = kind.entity_label();
        if !doc.entities.iter().any(|e| e.label == label) {
            return Ok(0);
        }

        let heads = graph.head_keys();
        let objects = doc.object_count();
        if heads.len() != objects {
            return Err(Error::Invariant(format!(
                "{objects} object entities but {} head nodes",
                heads.len()
            )));
        }

        // doc entity index → head node, zipped in enumeration order
        let mut heads_iter = heads.into_iter();
        let by_entity: Vec<Option<NodeKey>> = doc
            .entities
            .iter()
            .map(|e| if e.is_object() { heads_iter.next() } else { None })
            .collect();

        let has_and = doc.contains_word("and");
        let mut inserted = 0;

        for (i, entity) in doc.entities.iter().enumerate() {
            if entity.label != label {
                continue;
            }
            let resolved = self
                .relation_token(entity, kind)
                .ok_or(Unresolved::NoRelationToken)
                .and_then(|token| {
                    let (n0, n1) = resolve_pair(doc, &by_entity, i, has_and)?;
                    Ok((n0, n1, token))
                });
            match resolved {
                Ok((n0, n1, token)) => {
                    if graph.has_edge_of_kind(&n0, &n1, kind.edge_kind()) {
                        tracing::debug!(%n0, %n1, relation = %token.text, "relation edge already present");
                        continue;
                    }
                    tracing::debug!(%n0, %n1, relation = %token.text, "linking relation");
                    graph.add_edge(Edge::new(n0, n1, kind.edge_kind(), token.text.clone()))?;
                    inserted += 1;
                }
                Err(reason) => {
                    tracing::warn!(
                        index = i,
                        span = %entity.text,
                        %reason,
                        "skipping unresolved {}", label
                    );
                }
            }
        }

        Ok(inserted)
    }
}

/// Head-node pair for the relation entity at `i`.
fn resolve_pair(
    doc: &Document,
    by_entity: &[Option<NodeKey>],
    i: usize,
    has_and: bool,
) -> std::result::Result<(NodeKey, NodeKey), Unresolved> {
    let head_at = |j: usize| -> std::result::Result<NodeKey, Unresolved> {
        match by_entity.get(j) {
            Some(Some(key)) => Ok(key.clone()),
            Some(None) => Err(Unresolved::NotAnObject(j)),
            None => Err(Unresolved::OutOfRange(j as isize)),
        }
    };

    let left = if has_and && i > 1 {
        0
    } else {
        i.checked_sub(1).ok_or(Unresolved::OutOfRange(i as isize - 1))?
    };
    let n0 = head_at(left)?;

    let n1 = match head_at(i + 1) {
        Err(Unresolved::OutOfRange(_)) if followed_by_anaphor(doc, i) => {
            // the pronoun points at the object mentioned before the subject
            (0..left)
                .rev()
                .find_map(|j| by_entity[j].clone())
                .ok_or(Unresolved::OutOfRange(i as isize + 1))?
        }
        other => other?,
    };

    Ok((n0, n1))
}

fn followed_by_anaphor(doc: &Document, i: usize) -> bool {
    doc.entities.get(i).is_some_and(|e| {
        doc.text_after(e)
            .split(|c: char| !c.is_alphanumeric())
            .find(|w| !w.is_empty())
            .is_some_and(|w| ANAPHORS.iter().any(|a| a.eq_ignore_ascii_case(w)))
    })
}

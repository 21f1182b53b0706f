//! Lexicon-driven CLEVR annotator.
//!
//! Recognizes three span shapes:
//!
//! ```text
//! [size] [color] [material] shape      → CLEVR_OBJ  (CLEVR_OBJS if the shape is plural)
//! [in] <spatial term> [of]             → SPATIAL_RE
//! same <size|color|material|shape> as  → MATCHING_RE
//! ```
//!
//! Object spans are maximal runs of attribute words closed by a shape word,
//! with at most one word per attribute kind. Runs that never reach a shape
//! word are dropped.
//!
//! Token vectors are pseudo-random but a pure function of `(seed, word)`,
//! so two annotators built with the same seed agree exactly.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::tokenizer::{tokenize, Word, WordKind};
use super::{AnnotatorConfig, EntityAnnotator};
use crate::config::EngineConfig;
use crate::model::{AttributeKind, Document, Entity, EntityLabel, Token, TokenFlags};
use crate::relation::{RelationVocabulary, MATCHING_RELATIONS};
use crate::Result;

const SIZES: &[&str] = &["small", "tiny", "large", "big"];
const COLORS: &[&str] = &["gray", "grey", "red", "blue", "green", "brown", "purple", "cyan", "yellow"];
const MATERIALS: &[&str] = &["rubber", "matte", "metal", "metallic", "shiny"];
const SHAPES: &[&str] = &["cube", "block", "sphere", "ball", "cylinder", "thing", "object"];
const PLURAL_SHAPES: &[&str] = &["cubes", "blocks", "spheres", "balls", "cylinders", "things", "objects"];

/// Canonical value of a generic shape word; compatible with every shape.
const ANY_SHAPE: &str = "*";

/// Annotator backed by the fixed CLEVR vocabulary.
pub struct LexiconAnnotator {
    seed: u64,
    vector_width: usize,
    spatial: RelationVocabulary,
    /// word → vector
    vectors: RwLock<HashMap<String, Arc<[f32]>>>,
}

impl LexiconAnnotator {
    pub fn new(seed: u64, config: &AnnotatorConfig) -> Self {
        Self::with_vocabulary(seed, config, RelationVocabulary::default())
    }

    pub fn with_vocabulary(seed: u64, config: &AnnotatorConfig, spatial: RelationVocabulary) -> Self {
        Self {
            seed,
            vector_width: config.vector_width,
            spatial,
            vectors: RwLock::new(HashMap::new()),
        }
    }

    /// Build from the engine config, loading the relation vocabulary file if one is set.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let spatial = match &config.relations.vocabulary_path {
            Some(path) => RelationVocabulary::from_path(path)?,
            None => RelationVocabulary::default(),
        };
        Ok(Self::with_vocabulary(config.seed, &config.annotator, spatial))
    }

    pub fn vector_width(&self) -> usize {
        self.vector_width
    }

    pub fn spatial_vocabulary(&self) -> &RelationVocabulary {
        &self.spatial
    }

    /// Attribute flags of a lowercased word.
    pub fn flags(word: &str) -> TokenFlags {
        TokenFlags {
            is_size: SIZES.contains(&word),
            is_color: COLORS.contains(&word),
            is_material: MATERIALS.contains(&word),
            is_shape: SHAPES.contains(&word),
            is_shapes: PLURAL_SHAPES.contains(&word),
        }
    }

    /// Seeded vector for a lowercased word, cached.
    pub fn vector(&self, word: &str) -> Vec<f32> {
        if let Some(v) = self.vectors.read().get(word) {
            return v.to_vec();
        }
        let v: Arc<[f32]> = seeded_vector(self.seed, word, self.vector_width).into();
        self.vectors.write().entry(word.to_owned()).or_insert(v).to_vec()
    }

    fn token(&self, word: &Word) -> Token {
        let lower = word.lower();
        Token::new(word.text.clone(), Self::flags(&lower), self.vector(&lower))
    }

    fn span(&self, text: &str, label: EntityLabel, words: &[&Word]) -> Entity {
        let start = words.first().map_or(0, |w| w.span.start);
        let end = words.last().map_or(start, |w| w.span.end);
        Entity {
            label,
            text: text[start..end].to_owned(),
            start,
            end,
            tokens: words.iter().map(|w| self.token(w)).collect(),
        }
    }

    /// `same <kind> as` starting at `i`.
    fn matching_span(words: &[Word], i: usize) -> Option<usize> {
        let kind = words.get(i + 1)?;
        let closing = words.get(i + 2)?;
        let is_kind = kind.kind == WordKind::Alpha && MATCHING_RELATIONS.contains(&kind.lower().as_str());
        (words[i].is("same") && is_kind && closing.is("as")).then_some(i + 3)
    }
}

/// Canonical form of an attribute value, for paraphrase-tolerant comparison.
fn canonical(kind: AttributeKind, word: &str) -> String {
    let lower = word.trim().to_ascii_lowercase();
    let canon = match (kind, lower.as_str()) {
        (AttributeKind::Size, "small" | "tiny") => "small",
        (AttributeKind::Size, "large" | "big") => "large",
        (AttributeKind::Color, "grey") => "gray",
        (AttributeKind::Material, "metal" | "metallic" | "shiny") => "metal",
        (AttributeKind::Material, "rubber" | "matte") => "rubber",
        (AttributeKind::Shape, "cube" | "cubes" | "block" | "blocks") => "cube",
        (AttributeKind::Shape, "sphere" | "spheres" | "ball" | "balls") => "sphere",
        (AttributeKind::Shape, "cylinder" | "cylinders") => "cylinder",
        (AttributeKind::Shape, "thing" | "things" | "object" | "objects") => ANY_SHAPE,
        _ => return lower,
    };
    canon.to_owned()
}

/// splitmix64 stream seeded by `seed` and the FNV-1a hash of `word`,
/// mapped to floats in [-1, 1).
fn seeded_vector(seed: u64, word: &str, width: usize) -> Vec<f32> {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in word.bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let mut state = seed ^ hash;
    (0..width)
        .map(|_| {
            state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^= z >> 31;
            ((z >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        })
        .collect()
}

impl EntityAnnotator for LexiconAnnotator {
    fn annotate(&self, text: &str) -> Result<Document> {
        let words = tokenize(text);
        let mut entities = Vec::new();
        let mut run: SmallVec<[&Word; 4]> = SmallVec::new();
        let mut run_kinds: SmallVec<[AttributeKind; 4]> = SmallVec::new();

        // Attribute runs without a shape word are not objects.
        let flush = |run: &mut SmallVec<[&Word; 4]>, kinds: &mut SmallVec<[AttributeKind; 4]>, out: &mut Vec<Entity>| {
            if kinds.last() == Some(&AttributeKind::Shape) {
                let plural = run.last().is_some_and(|w| PLURAL_SHAPES.contains(&w.lower().as_str()));
                let label = if plural { EntityLabel::ClevrObjs } else { EntityLabel::ClevrObj };
                out.push(self.span(text, label, run));
            }
            run.clear();
            kinds.clear();
        };

        let mut i = 0;
        while i < words.len() {
            let word = &words[i];
            let lower = word.lower();

            if let Some(next) = Self::matching_span(&words, i) {
                flush(&mut run, &mut run_kinds, &mut entities);
                let span: Vec<&Word> = words[i..next].iter().collect();
                entities.push(self.span(text, EntityLabel::MatchingRe, &span));
                i = next;
                continue;
            }

            if word.kind == WordKind::Alpha && self.spatial.contains(&lower) {
                flush(&mut run, &mut run_kinds, &mut entities);
                let mut span: Vec<&Word> = Vec::with_capacity(3);
                if lower == "front" && i > 0 && words[i - 1].is("in") {
                    span.push(&words[i - 1]);
                }
                span.push(word);
                let mut next = i + 1;
                if words.get(next).is_some_and(|w| w.is("of")) {
                    span.push(&words[next]);
                    next += 1;
                }
                entities.push(self.span(text, EntityLabel::SpatialRe, &span));
                i = next;
                continue;
            }

            let kind = AttributeKind::classify(Self::flags(&lower));
            if word.kind != WordKind::Alpha || kind == AttributeKind::Unknown {
                flush(&mut run, &mut run_kinds, &mut entities);
            } else {
                if run_kinds.contains(&kind) {
                    flush(&mut run, &mut run_kinds, &mut entities);
                }
                run.push(word);
                run_kinds.push(kind);
                if kind == AttributeKind::Shape {
                    flush(&mut run, &mut run_kinds, &mut entities);
                }
            }
            i += 1;
        }
        flush(&mut run, &mut run_kinds, &mut entities);

        tracing::debug!(text, entities = entities.len(), "annotated");
        Ok(Document { text: text.to_owned(), entities })
    }

    fn attributes_compatible(&self, kind: AttributeKind, source: &str, target: Option<&str>) -> bool {
        let source = canonical(kind, source);
        if kind == AttributeKind::Shape && source == ANY_SHAPE {
            return true;
        }
        match target {
            Some(target) => source == canonical(kind, target),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotator() -> LexiconAnnotator {
        LexiconAnnotator::new(42, &AnnotatorConfig::default())
    }

    fn spans(doc: &Document) -> Vec<(EntityLabel, &str)> {
        doc.entities.iter().map(|e| (e.label, e.text.as_str())).collect()
    }

    #[test]
    fn test_objects_and_spatial_relation() {
        let doc = annotator().annotate("green metal block; tiny metal thing is to the left of it").unwrap();
        assert_eq!(
            spans(&doc),
            vec![
                (EntityLabel::ClevrObj, "green metal block"),
                (EntityLabel::ClevrObj, "tiny metal thing"),
                (EntityLabel::SpatialRe, "left of"),
            ]
        );
        assert_eq!(doc.text_after(&doc.entities[2]), " it");
    }

    #[test]
    fn test_question_with_matching_and_front() {
        let doc = annotator()
            .annotate("Is there a blue thing that is the same size as the brown shiny object in front of the gray matte sphere?")
            .unwrap();
        assert_eq!(
            spans(&doc),
            vec![
                (EntityLabel::ClevrObj, "blue thing"),
                (EntityLabel::MatchingRe, "same size as"),
                (EntityLabel::ClevrObj, "brown shiny object"),
                (EntityLabel::SpatialRe, "in front of"),
                (EntityLabel::ClevrObj, "gray matte sphere"),
            ]
        );
    }

    #[test]
    fn test_plural_and_dangling_attributes() {
        let doc = annotator().annotate("the red cubes and the large one").unwrap();
        assert_eq!(spans(&doc), vec![(EntityLabel::ClevrObjs, "red cubes")]);
        assert!(doc.has_plurals());
    }

    #[test]
    fn test_repeated_kind_splits_run() {
        let doc = annotator().annotate("small large cube").unwrap();
        assert_eq!(spans(&doc), vec![(EntityLabel::ClevrObj, "large cube")]);
    }

    #[test]
    fn test_vectors_are_seeded_and_cached() {
        let a = annotator();
        let b = annotator();
        let c = LexiconAnnotator::new(7, &AnnotatorConfig::default());
        assert_eq!(a.vector("cube"), b.vector("cube"));
        assert_eq!(a.vector("cube"), a.vector("cube"));
        assert_ne!(a.vector("cube"), c.vector("cube"));
        assert_eq!(a.vector("cube").len(), 96);
        assert!(a.vector("sphere").iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn test_compatibility() {
        let a = annotator();
        assert!(a.attributes_compatible(AttributeKind::Size, "tiny", Some("small")));
        assert!(!a.attributes_compatible(AttributeKind::Size, "tiny", Some("large")));
        assert!(a.attributes_compatible(AttributeKind::Material, "shiny", Some("metal")));
        assert!(a.attributes_compatible(AttributeKind::Shape, "block", Some("cube")));
        assert!(a.attributes_compatible(AttributeKind::Shape, "thing", Some("sphere")));
        assert!(a.attributes_compatible(AttributeKind::Shape, "object", None));
        assert!(!a.attributes_compatible(AttributeKind::Material, "rubber", None));
    }
}

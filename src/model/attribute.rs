//! Attribute kinds and the token classification order.

use serde::{Deserialize, Serialize};

/// Boolean attribute predicates an annotator reports for one token.
///
/// More than one flag may be set; [`AttributeKind::classify`] decides which
/// one wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenFlags {
    pub is_size: bool,
    pub is_color: bool,
    pub is_material: bool,
    pub is_shape: bool,
    /// Plural shape noun (`cubes`, `things`).
    pub is_shapes: bool,
}

impl TokenFlags {
    pub fn size() -> Self { Self { is_size: true, ..Self::default() } }
    pub fn color() -> Self { Self { is_color: true, ..Self::default() } }
    pub fn material() -> Self { Self { is_material: true, ..Self::default() } }
    pub fn shape() -> Self { Self { is_shape: true, ..Self::default() } }
    pub fn shapes() -> Self { Self { is_shapes: true, ..Self::default() } }
}

/// The kind of attribute a token contributes to an object.
///
/// Variants are declared in slot order, so the derived `Ord` is the
/// embedding order `Size < Color < Material < Shape < Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Size,
    Color,
    Material,
    Shape,
    Unknown,
}

impl AttributeKind {
    /// The four kinds that own a slot in an entity vector.
    pub const SLOTTED: [AttributeKind; 4] = [
        AttributeKind::Size,
        AttributeKind::Color,
        AttributeKind::Material,
        AttributeKind::Shape,
    ];

    /// Classify a token. Priority: size > color > material > shape > unknown.
    /// Plural shapes classify as `Shape`; the head node label carries plurality.
    pub fn classify(flags: TokenFlags) -> Self {
        if flags.is_size {
            AttributeKind::Size
        } else if flags.is_color {
            AttributeKind::Color
        } else if flags.is_material {
            AttributeKind::Material
        } else if flags.is_shape || flags.is_shapes {
            AttributeKind::Shape
        } else {
            AttributeKind::Unknown
        }
    }

    /// Relative position inside an entity embedding (0..=4).
    pub fn position(self) -> usize {
        match self {
            AttributeKind::Size => 0,
            AttributeKind::Color => 1,
            AttributeKind::Material => 2,
            AttributeKind::Shape => 3,
            AttributeKind::Unknown => 4,
        }
    }

    /// Slot index for slotted kinds, `None` for `Unknown`.
    pub fn slot(self) -> Option<usize> {
        match self {
            AttributeKind::Unknown => None,
            other => Some(other.position()),
        }
    }

    /// Tag used to build attribute node keys (`<Z>`, `<C2>`, ...).
    pub fn tag(self) -> &'static str {
        match self {
            AttributeKind::Size => "Z",
            AttributeKind::Color => "C",
            AttributeKind::Material => "M",
            AttributeKind::Shape => "S",
            AttributeKind::Unknown => "UNK",
        }
    }

    /// Node/edge label of the kind.
    pub fn label(self) -> &'static str {
        match self {
            AttributeKind::Size => "size",
            AttributeKind::Color => "color",
            AttributeKind::Material => "material",
            AttributeKind::Shape => "shape",
            AttributeKind::Unknown => "<UNK>",
        }
    }

    /// Attribute node key for the `n`-th entity of a scene.
    pub fn node_key(self, ent_num: usize) -> String {
        if ent_num <= 1 {
            format!("<{}>", self.tag())
        } else {
            format!("<{}{}>", self.tag(), ent_num)
        }
    }
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_priority() {
        let all = TokenFlags {
            is_size: true, is_color: true, is_material: true, is_shape: true, is_shapes: true,
        };
        assert_eq!(AttributeKind::classify(all), AttributeKind::Size);

        let no_size = TokenFlags { is_size: false, ..all };
        assert_eq!(AttributeKind::classify(no_size), AttributeKind::Color);

        let material_shape = TokenFlags { is_material: true, is_shape: true, ..TokenFlags::default() };
        assert_eq!(AttributeKind::classify(material_shape), AttributeKind::Material);

        assert_eq!(AttributeKind::classify(TokenFlags::shapes()), AttributeKind::Shape);
        assert_eq!(AttributeKind::classify(TokenFlags::default()), AttributeKind::Unknown);
    }

    #[test]
    fn test_position_matches_ord() {
        let mut kinds = vec![
            AttributeKind::Unknown, AttributeKind::Shape, AttributeKind::Size,
            AttributeKind::Material, AttributeKind::Color,
        ];
        kinds.sort();
        let positions: Vec<usize> = kinds.iter().map(|k| k.position()).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
        assert_eq!(AttributeKind::Unknown.slot(), None);
    }

    #[test]
    fn test_node_keys() {
        assert_eq!(AttributeKind::Size.node_key(1), "<Z>");
        assert_eq!(AttributeKind::Size.node_key(0), "<Z>");
        assert_eq!(AttributeKind::Color.node_key(2), "<C2>");
        assert_eq!(AttributeKind::Unknown.node_key(3), "<UNK3>");
    }
}

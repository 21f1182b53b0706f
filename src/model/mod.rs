//! # Scene Graph Model
//!
//! Plain data that crosses every boundary: annotator ↔ builder ↔ composer ↔
//! linker ↔ matcher ↔ embedding.
//!
//! Design rule: no annotator internals and no numeric tensors here.
//! This module is pure data: no I/O, no configuration.

pub mod attribute;
pub mod entity;
pub mod node;
pub mod edge;
pub mod graph;

pub use attribute::{AttributeKind, TokenFlags};
pub use entity::{Document, Entity, EntityLabel, Token};
pub use node::{Node, NodeKey, NodeKind};
pub use edge::{Edge, EdgeKind};
pub use graph::SceneGraph;

//! Scene Graph Composer: disjoint union of all entity graphs of a document.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::builder::{build_entity_graph, BuilderOptions, EntityGraph};
use crate::model::{Document, SceneGraph};
use crate::{Error, Result};

/// Largest number of objects in one CLEVR scene.
pub const MAX_SCENE_OBJECTS: usize = 10;

/// Composition options.
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    pub builder: BuilderOptions,
    /// One position per object entity, in enumeration order.
    pub pos: Option<Vec<[f64; 3]>>,
    /// Reject documents with more than [`MAX_SCENE_OBJECTS`] objects.
    pub cap_to_10_objs: bool,
}

/// A composed scene graph and the per-entity artifacts it was built from.
#[derive(Debug, Clone)]
pub struct ComposedScene {
    pub graph: SceneGraph,
    /// Object number (1-based) → entity graph artifacts. Derived data only.
    pub entity_graphs: BTreeMap<usize, EntityGraph>,
}

/// Build one entity graph per object entity of `doc` and union them.
pub fn compose_scene_graph(doc: &Document, options: &ComposeOptions) -> Result<ComposedScene> {
    let objects: Vec<Arc<_>> = doc.objects().cloned().map(Arc::new).collect();
    let nco = objects.len();

    if options.cap_to_10_objs && nco > MAX_SCENE_OBJECTS {
        return Err(Error::TooManyObjects { count: nco, max: MAX_SCENE_OBJECTS });
    }
    if let Some(pos) = &options.pos {
        if pos.len() != nco {
            return Err(Error::PositionMismatch { positions: pos.len(), objects: nco });
        }
    }
    if nco == 0 {
        return Err(Error::NoObjects(doc.text.clone()));
    }

    let mut graph = if options.builder.directed { SceneGraph::directed() } else { SceneGraph::new() };
    let mut entity_graphs = BTreeMap::new();
    for (i, entity) in objects.iter().enumerate() {
        let ent_num = i + 1;
        let pos = options.pos.as_ref().map(|p| p[i]);
        let entity_graph = build_entity_graph(entity, ent_num, pos, &options.builder)?;
        graph.union(entity_graph.graph.clone())?;
        entity_graphs.insert(ent_num, entity_graph);
    }

    tracing::debug!(
        objects = nco,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "composed scene graph"
    );

    Ok(ComposedScene { graph, entity_graphs })
}

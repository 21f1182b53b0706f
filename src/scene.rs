//! Derendered image scenes, the grounding side of cross-modal matching.

use serde::{Deserialize, Serialize};

use crate::composer::MAX_SCENE_OBJECTS;
use crate::{Error, Result};

/// One object proposal of a derendered scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub size: String,
    pub color: String,
    pub material: String,
    pub shape: String,
    /// `(x, y, z)` scene coordinates.
    pub position: [f64; 3],
}

impl SceneObject {
    /// `"size color material shape"`.
    pub fn describe(&self) -> String {
        format!("{} {} {} {}", self.size, self.color, self.material, self.shape)
    }
}

/// A scene record as produced by the derenderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub image_index: usize,
    pub image_filename: String,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

impl SceneRecord {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Skeletal caption, one object description per object joined by `", "`.
    /// `None` when the derenderer produced no objects.
    pub fn caption(&self) -> Option<String> {
        if self.objects.is_empty() {
            return None;
        }
        let parts: Vec<String> = self.objects.iter().map(SceneObject::describe).collect();
        Some(parts.join(", "))
    }

    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.objects.iter().map(|o| o.position).collect()
    }

    /// Fails with [`Error::TooManyObjects`] above the CLEVR object limit.
    pub fn check_object_cap(&self) -> Result<()> {
        if self.objects.len() > MAX_SCENE_OBJECTS {
            return Err(Error::TooManyObjects { count: self.objects.len(), max: MAX_SCENE_OBJECTS });
        }
        Ok(())
    }

    /// `SKIP_{index}_{filename}`.
    pub fn skip_sentinel(&self) -> String {
        format!("SKIP_{}_{}", self.image_index, self.image_filename)
    }
}

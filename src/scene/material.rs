use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use crate::error::{Result, ViewerError};

/// Flat color plus optional texture file names. An empty name means the
/// slot is unused.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Material {
    pub color: [f32; 3],
    #[serde(default)]
    pub diffuse: String,
    #[serde(default)]
    pub specular: String,
}

fn non_empty(name: &str) -> Option<&str> {
    (!name.is_empty()).then_some(name)
}

impl Material {
    pub fn diffuse_texture(&self) -> Option<&str> {
        non_empty(&self.diffuse)
    }

    pub fn specular_texture(&self) -> Option<&str> {
        non_empty(&self.specular)
    }
}

#[derive(Debug, Default)]
pub struct MaterialTable {
    materials: HashMap<String, Material>,
}

impl MaterialTable {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let materials: HashMap<String, Material> =
            serde_json::from_slice(bytes).map_err(|source| ViewerError::Json {
                asset: "materials",
                source,
            })?;

        for (part, material) in &materials {
            if material.color.iter().any(|c| !(0.0..=1.0).contains(c)) {
                tracing::warn!(part = %part, color = ?material.color, "material color outside 0..1");
            }
        }

        Ok(Self { materials })
    }

    pub fn get(&self, part: &str) -> Option<&Material> {
        self.materials.get(part)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Every texture referenced by any material, sorted and deduplicated.
    pub fn texture_names(&self) -> BTreeSet<&str> {
        self.materials
            .values()
            .flat_map(|m| [m.diffuse_texture(), m.specular_texture()])
            .flatten()
            .collect()
    }
}

pub mod geometry;
pub mod material;

use std::path::Path;

pub use geometry::{Geometry, Part, Vertex};
pub use material::{Material, MaterialTable};

use crate::error::{Result, ViewerError};

/// Geometry plus the material of every part, loaded once at startup.
#[derive(Debug)]
pub struct Scene {
    pub geometry: Geometry,
    pub materials: MaterialTable,
}

impl Scene {
    pub fn from_json(geometry: &[u8], materials: &[u8]) -> Result<Self> {
        let geometry = Geometry::from_json(geometry)?;
        let materials = MaterialTable::from_json(materials)?;

        if let Some(part) = geometry.parts().iter().find(|p| materials.get(&p.name).is_none()) {
            return Err(ViewerError::MissingMaterial(part.name.clone()));
        }

        Ok(Self { geometry, materials })
    }

    pub fn load(geometry_path: &Path, materials_path: &Path) -> Result<Self> {
        let geometry = read_asset(geometry_path)?;
        let materials = read_asset(materials_path)?;
        let scene = Self::from_json(&geometry, &materials)?;

        tracing::info!(
            vertices = scene.geometry.vertices().len(),
            indices = scene.geometry.indices().len(),
            parts = scene.geometry.parts().len(),
            materials = scene.materials.len(),
            "scene loaded"
        );
        Ok(scene)
    }

    /// Material for `part`. Every part is checked at load time.
    pub fn material(&self, part: &Part) -> Result<&Material> {
        self.materials
            .get(&part.name)
            .ok_or_else(|| ViewerError::MissingMaterial(part.name.clone()))
    }
}

pub fn read_asset(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| ViewerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

use std::fmt;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::{Result, ViewerError};

pub const FLOATS_PER_VERTEX: usize = 8;

/// Interleaved vertex as laid out in the vertex buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    fn from_floats(f: &[f32]) -> Self {
        Self {
            position: [f[0], f[1], f[2]],
            normal: [f[3], f[4], f[5]],
            tex_coord: [f[6], f[7]],
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// A named run of triangles sharing one material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub triangles: Range<u32>,
}

impl Part {
    /// Range into the index buffer covered by this part.
    pub fn index_range(&self) -> Range<u32> {
        self.triangles.start * 3..self.triangles.end * 3
    }
}

#[derive(Deserialize)]
struct GeometryAsset {
    vertexdata: Vec<f32>,
    indexdata: Vec<u16>,
    #[serde(default, deserialize_with = "ordered_groups")]
    groups: Vec<(String, Vec<i64>)>,
}

/// Keeps groups in file order; a `HashMap` would scramble draw order.
fn ordered_groups<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, Vec<i64>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct GroupsVisitor;

    impl<'de> Visitor<'de> for GroupsVisitor {
        type Value = Vec<(String, Vec<i64>)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map from part name to [start, end]")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
            let mut groups = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                groups.push(entry);
            }
            Ok(groups)
        }
    }

    deserializer.deserialize_map(GroupsVisitor)
}

/// Static mesh: one vertex buffer, one 16-bit index buffer and the parts
/// that slice it.
#[derive(Debug)]
pub struct Geometry {
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    parts: Vec<Part>,
}

impl Geometry {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let asset: GeometryAsset = serde_json::from_slice(bytes).map_err(|source| ViewerError::Json {
            asset: "geometry",
            source,
        })?;
        Self::from_asset(asset)
    }

    fn from_asset(asset: GeometryAsset) -> Result<Self> {
        if asset.vertexdata.len() % FLOATS_PER_VERTEX != 0 {
            return Err(ViewerError::MalformedAsset(format!(
                "vertexdata has {} floats, not a multiple of {FLOATS_PER_VERTEX}",
                asset.vertexdata.len()
            )));
        }

        let vertices: Vec<Vertex> = asset
            .vertexdata
            .chunks_exact(FLOATS_PER_VERTEX)
            .map(Vertex::from_floats)
            .collect();

        if let Some((pos, index)) = asset
            .indexdata
            .iter()
            .enumerate()
            .find(|(_, i)| usize::from(**i) >= vertices.len())
        {
            return Err(ViewerError::MalformedAsset(format!(
                "index {index} at position {pos} addresses one of only {} vertices",
                vertices.len()
            )));
        }

        let triangle_count = (asset.indexdata.len() / 3) as i64;
        let mut parts = Vec::with_capacity(asset.groups.len());
        for (name, range) in asset.groups {
            if parts.iter().any(|p: &Part| p.name == name) {
                return Err(ViewerError::MalformedAsset(format!("group {name:?} appears twice")));
            }
            let &[start, end] = range.as_slice() else {
                return Err(ViewerError::MalformedAsset(format!(
                    "group {name:?} has {} bounds, expected [start, end]",
                    range.len()
                )));
            };
            if start < 0 || start > end || end > triangle_count {
                return Err(ViewerError::MalformedAsset(format!(
                    "group {name:?} range [{start}, {end}) exceeds {triangle_count} triangles"
                )));
            }
            parts.push(Part {
                name,
                triangles: start as u32..end as u32,
            });
        }

        Ok(Self {
            vertices,
            indices: asset.indexdata,
            parts,
        })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Parts in the order they appear in the asset.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_json(groups: &str) -> String {
        format!(
            r#"{{
                "vertexdata": [
                    0, 0, 0,  0, 0, 1,  0, 0,
                    1, 0, 0,  0, 0, 1,  1, 0,
                    1, 1, 0,  0, 0, 1,  1, 1,
                    0, 1, 0,  0, 0, 1,  0, 1
                ],
                "indexdata": [0, 1, 2, 0, 2, 3],
                "groups": {groups}
            }}"#
        )
    }

    #[test]
    fn test_parse_interleaved_vertices() {
        let geometry = Geometry::from_json(quad_json(r#"{"quad": [0, 2]}"#).as_bytes()).unwrap();

        assert_eq!(geometry.vertices().len(), 4);
        assert_eq!(
            geometry.vertices()[2],
            Vertex {
                position: [1.0, 1.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                tex_coord: [1.0, 1.0],
            }
        );
        assert_eq!(geometry.indices(), &[0, 1, 2, 0, 2, 3]);
        assert_eq!(geometry.parts()[0].index_range(), 0..6);
    }

    #[test]
    fn test_groups_keep_file_order() {
        let geometry =
            Geometry::from_json(quad_json(r#"{"zeta": [1, 2], "alpha": [0, 1]}"#).as_bytes()).unwrap();

        let names: Vec<_> = geometry.parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert_eq!(geometry.parts()[0].triangles, 1..2);
    }

    #[test]
    fn test_vertex_float_count_must_be_multiple_of_eight() {
        let json = r#"{"vertexdata": [0, 0, 0, 0, 0, 1, 0], "indexdata": [], "groups": {}}"#;
        let err = Geometry::from_json(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ViewerError::MalformedAsset(_)));
    }

    #[test]
    fn test_index_out_of_range() {
        let json = r#"{"vertexdata": [0, 0, 0, 0, 0, 1, 0, 0], "indexdata": [0, 0, 1], "groups": {}}"#;
        let err = Geometry::from_json(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ViewerError::MalformedAsset(_)));
    }

    #[test]
    fn test_group_out_of_range() {
        for groups in [
            r#"{"quad": [0, 3]}"#,
            r#"{"quad": [-1, 1]}"#,
            r#"{"quad": [2, 1]}"#,
            r#"{"quad": [0]}"#,
        ] {
            let err = Geometry::from_json(quad_json(groups).as_bytes()).unwrap_err();
            assert!(matches!(err, ViewerError::MalformedAsset(_)), "{groups}");
        }
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let json = quad_json(r#"{"quad": [0, 1], "quad": [1, 2]}"#);
        let err = Geometry::from_json(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ViewerError::MalformedAsset(msg) if msg.contains("quad")));
    }

    #[test]
    fn test_not_json() {
        let err = Geometry::from_json(b"vertexdata").unwrap_err();
        assert!(matches!(err, ViewerError::Json { asset: "geometry", .. }));
    }

    #[test]
    fn test_vertex_layout_stride() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, (FLOATS_PER_VERTEX * 4) as u64);
        let offsets: Vec<_> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 24]);
    }
}

//! Per-frame draw orchestration.
//!
//! [`FrameRenderer`] owns the model transform and the resolved draw list.
//! Each frame it advances the rotation, pushes the transforms and walks the
//! parts through a [`PartEncoder`], which is the only thing that touches
//! the GPU.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::config::{RotationConfig, ViewConfig};
use crate::error::Result;
use crate::math;
use crate::renderer::texture::{TextureCache, TextureId};
use crate::scene::Scene;
use crate::ui::state::RotationFlags;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TransformUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorUniform {
    pub color: [f32; 3],
    pub _padding: f32,
}

impl ColorUniform {
    pub fn new(color: [f32; 3]) -> Self {
        Self { color, _padding: 0.0 }
    }
}

/// Records one frame's worth of part draws.
///
/// Calls arrive strictly in order: each `upload_color` belongs to the
/// `draw_indexed` that follows it. Implementations must not reorder a draw
/// relative to its color write.
pub trait PartEncoder {
    fn upload_transforms(&mut self, uniforms: &TransformUniforms);
    fn bind_textures(&mut self, diffuse: Option<TextureId>, specular: Option<TextureId>);
    fn upload_color(&mut self, color: ColorUniform);
    fn draw_indexed(&mut self, indices: Range<u32>);
}

/// A part with its material already resolved to texture handles.
#[derive(Clone, Debug, PartialEq)]
pub struct PartDraw {
    pub name: String,
    pub indices: Range<u32>,
    pub color: [f32; 3],
    pub diffuse: Option<TextureId>,
    pub specular: Option<TextureId>,
}

pub struct FrameRenderer {
    parts: Vec<PartDraw>,
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    step: f32,
}

impl FrameRenderer {
    pub fn new<T>(
        scene: &Scene,
        textures: &TextureCache<T>,
        view: &ViewConfig,
        rotation: &RotationConfig,
    ) -> Result<Self> {
        view.validate()?;
        rotation.validate()?;

        let parts = scene
            .geometry
            .parts()
            .iter()
            .map(|part| -> Result<PartDraw> {
                let material = scene.material(part)?;
                Ok(PartDraw {
                    name: part.name.clone(),
                    indices: part.index_range(),
                    color: material.color,
                    diffuse: textures.resolve(material.diffuse_texture())?,
                    specular: textures.resolve(material.specular_texture())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let extent = view.ortho_extent;
        Ok(Self {
            parts,
            model: math::rotate_x(math::identity(), math::to_radians(view.initial_tilt_x_degrees)),
            view: math::look_at(
                Vec3::from_array(view.eye),
                Vec3::from_array(view.center),
                Vec3::from_array(view.up),
            ),
            projection: math::orthographic(-extent, extent, -extent, extent, -extent, extent),
            step: math::to_radians(rotation.step_degrees),
        })
    }

    pub fn parts(&self) -> &[PartDraw] {
        &self.parts
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    /// Applies one frame's rotation increment for every enabled axis.
    pub fn advance(&mut self, flags: RotationFlags) {
        if flags.x {
            self.model = math::rotate_x(self.model, self.step);
        }
        if flags.y {
            self.model = math::rotate_y(self.model, self.step);
        }
        if flags.z {
            self.model = math::rotate_z(self.model, self.step);
        }
    }

    pub fn uniforms(&self) -> TransformUniforms {
        TransformUniforms {
            model: self.model.to_cols_array_2d(),
            view: self.view.to_cols_array_2d(),
            projection: self.projection.to_cols_array_2d(),
        }
    }

    /// Advances the model and records every part. Returns the draw count.
    pub fn encode_frame(&mut self, flags: RotationFlags, encoder: &mut impl PartEncoder) -> u32 {
        self.advance(flags);
        encoder.upload_transforms(&self.uniforms());

        for part in &self.parts {
            encoder.bind_textures(part.diffuse, part.specular);
            encoder.upload_color(ColorUniform::new(part.color));
            encoder.draw_indexed(part.indices.clone());
        }
        self.parts.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::error::ViewerError;
    use crate::scene::tests::two_part_scene;

    #[derive(Debug, PartialEq)]
    enum Command {
        Transforms(TransformUniforms),
        Textures(Option<TextureId>, Option<TextureId>),
        Color([f32; 3]),
        Draw(Range<u32>),
    }

    #[derive(Default)]
    struct RecordingEncoder {
        commands: Vec<Command>,
    }

    impl PartEncoder for RecordingEncoder {
        fn upload_transforms(&mut self, uniforms: &TransformUniforms) {
            self.commands.push(Command::Transforms(*uniforms));
        }

        fn bind_textures(&mut self, diffuse: Option<TextureId>, specular: Option<TextureId>) {
            self.commands.push(Command::Textures(diffuse, specular));
        }

        fn upload_color(&mut self, color: ColorUniform) {
            self.commands.push(Command::Color(color.color));
        }

        fn draw_indexed(&mut self, indices: Range<u32>) {
            self.commands.push(Command::Draw(indices));
        }
    }

    fn loaded_textures() -> TextureCache<()> {
        let mut cache = TextureCache::default();
        cache.get_or_load("body.png", |_| Ok(())).unwrap();
        cache.get_or_load("body_spec.png", |_| Ok(())).unwrap();
        cache
    }

    fn renderer() -> FrameRenderer {
        let config = ViewerConfig::default();
        FrameRenderer::new(&two_part_scene(), &loaded_textures(), &config.view, &config.rotation).unwrap()
    }

    const STILL: RotationFlags = RotationFlags {
        x: false,
        y: false,
        z: false,
    };

    #[test]
    fn test_two_part_frame() {
        let textures = loaded_textures();
        let mut renderer = renderer();
        let mut encoder = RecordingEncoder::default();

        let draws = renderer.encode_frame(STILL, &mut encoder);

        assert_eq!(draws, 2);
        assert_eq!(
            encoder.commands[1..],
            [
                Command::Textures(None, None),
                Command::Color([0.1, 0.1, 0.1]),
                Command::Draw(0..6),
                Command::Textures(textures.get("body.png"), textures.get("body_spec.png")),
                Command::Color([0.9, 0.2, 0.1]),
                Command::Draw(6..15),
            ]
        );

        let draw_sizes: Vec<_> = encoder
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::Draw(r) => Some(r.len()),
                _ => None,
            })
            .collect();
        assert_eq!(draw_sizes, [6, 9]);
    }

    #[test]
    fn test_transforms_uploaded_first() {
        let mut renderer = renderer();
        let mut encoder = RecordingEncoder::default();
        renderer.encode_frame(STILL, &mut encoder);

        let Command::Transforms(uniforms) = &encoder.commands[0] else {
            panic!("first command was {:?}", encoder.commands[0]);
        };
        assert_eq!(*uniforms, renderer.uniforms());
    }

    #[test]
    fn test_still_frame_keeps_initial_tilt() {
        let mut renderer = renderer();
        let tilted = math::rotate_x(math::identity(), math::to_radians(60.0));
        renderer.encode_frame(STILL, &mut RecordingEncoder::default());
        assert!(renderer.model().abs_diff_eq(tilted, 1e-6));
    }

    #[test]
    fn test_each_frame_advances_half_a_degree() {
        let mut renderer = renderer();
        let start = renderer.model();
        let flags = RotationFlags {
            x: false,
            y: true,
            z: true,
        };

        for _ in 0..3 {
            renderer.encode_frame(flags, &mut RecordingEncoder::default());
        }

        let mut expected = start;
        for _ in 0..3 {
            expected = math::rotate_y(expected, math::to_radians(0.5));
            expected = math::rotate_z(expected, math::to_radians(0.5));
        }
        assert!(renderer.model().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_full_revolution_returns_to_start() {
        let mut renderer = renderer();
        let start = renderer.model();
        let flags = RotationFlags {
            x: true,
            y: false,
            z: false,
        };
        for _ in 0..720 {
            renderer.advance(flags);
        }
        assert!(renderer.model().abs_diff_eq(start, 1e-3));
    }

    #[test]
    fn test_unloaded_texture_is_fatal() {
        let config = ViewerConfig::default();
        let empty: TextureCache<()> = TextureCache::default();
        let err = FrameRenderer::new(&two_part_scene(), &empty, &config.view, &config.rotation)
            .err()
            .unwrap();
        assert!(matches!(err, ViewerError::MissingTexture(ref name) if name == "body.png"));
    }

    #[test]
    fn test_degenerate_view_is_fatal() {
        let mut config = ViewerConfig::default();
        config.view.ortho_extent = 0;
        let err = FrameRenderer::new(&two_part_scene(), &loaded_textures(), &config.view, &config.rotation)
            .err()
            .unwrap();
        assert!(matches!(err, ViewerError::InvalidSetting { field: "view.ortho_extent", .. }));

        let mut config = ViewerConfig::default();
        config.view.eye = config.view.center;
        assert!(FrameRenderer::new(&two_part_scene(), &loaded_textures(), &config.view, &config.rotation).is_err());
    }

    #[test]
    fn test_uniform_sizes_match_shader() {
        assert_eq!(std::mem::size_of::<TransformUniforms>(), 192);
        assert_eq!(std::mem::size_of::<ColorUniform>(), 16);
    }
}

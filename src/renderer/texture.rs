use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::error::{Result, ViewerError};
use crate::scene::read_asset;

pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u32);

/// Textures keyed by file name. Filled at startup, read-only afterwards.
pub struct TextureCache<T> {
    textures: Vec<T>,
    by_name: HashMap<String, TextureId>,
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self {
            textures: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T> TextureCache<T> {
    /// Returns the cached handle for `name`, calling `load` only the first
    /// time a name is seen.
    pub fn get_or_load<F>(&mut self, name: &str, load: F) -> Result<TextureId>
    where
        F: FnOnce(&str) -> Result<T>,
    {
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }

        let texture = load(name)?;
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture);
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    /// Handle for `name`, or `None` when the name is empty. A non-empty
    /// name that was never loaded is an error.
    pub fn resolve(&self, name: Option<&str>) -> Result<Option<TextureId>> {
        name.map(|n| self.get(n).ok_or_else(|| ViewerError::MissingTexture(n.to_string())))
            .transpose()
    }

    pub fn texture(&self, id: TextureId) -> &T {
        &self.textures[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }
}

/// Decoded texture with its full mip chain, level 0 first. Rows are stored
/// bottom-up so texture coordinate (0, 0) is the image's lower-left corner.
#[derive(Debug)]
pub struct TextureImage {
    pub levels: Vec<RgbaImage>,
}

impl TextureImage {
    pub fn decode(name: &str, bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|source| ViewerError::Image {
            name: name.to_string(),
            source,
        })?;
        Ok(Self::from_rgba(imageops::flip_vertical(&image.to_rgba8())))
    }

    pub fn from_rgba(base: RgbaImage) -> Self {
        let mut levels = vec![base];
        loop {
            let last = &levels[levels.len() - 1];
            let (w, h) = last.dimensions();
            if w <= 1 && h <= 1 {
                break;
            }
            let next = imageops::resize(last, (w / 2).max(1), (h / 2).max(1), FilterType::Triangle);
            levels.push(next);
        }
        Self { levels }
    }

    pub fn width(&self) -> u32 {
        self.levels[0].width()
    }

    pub fn height(&self) -> u32 {
        self.levels[0].height()
    }

    pub fn mip_level_count(&self) -> u32 {
        self.levels.len() as u32
    }
}

pub struct GpuTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, image: &TextureImage) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: image.mip_level_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, pixels) in image.levels.iter().enumerate() {
            let (width, height) = pixels.dimensions();
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels.as_raw(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    /// 1x1 white texture bound wherever a material has no texture.
    pub fn fallback(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        Self::upload(device, queue, "Fallback Texture", &TextureImage::from_rgba(white))
    }
}

/// Loads every named texture from `dir` into a fresh cache.
pub fn load_textures<'a>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    dir: &Path,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<TextureCache<GpuTexture>> {
    let mut cache = TextureCache::default();
    for name in names {
        cache.get_or_load(name, |name| {
            let bytes = read_asset(&dir.join(name))?;
            let image = TextureImage::decode(name, &bytes)?;
            tracing::info!(
                name,
                width = image.width(),
                height = image.height(),
                mips = image.mip_level_count(),
                "texture loaded"
            );
            Ok(GpuTexture::upload(device, queue, name, &image))
        })?;
    }
    Ok(cache)
}

use egui::epaint::ImageDelta;
use egui::{TextureId, TexturesDelta};

/// Where egui's managed textures live.
pub trait TextureSink {
    fn update(&mut self, id: TextureId, delta: &ImageDelta);
    fn free(&mut self, id: &TextureId);
}

pub struct WgpuTextureSink<'a> {
    pub renderer: &'a mut egui_wgpu::Renderer,
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl TextureSink for WgpuTextureSink<'_> {
    fn update(&mut self, id: TextureId, delta: &ImageDelta) {
        self.renderer.update_texture(self.device, self.queue, id, delta);
    }

    fn free(&mut self, id: &TextureId) {
        self.renderer.free_texture(id);
    }
}

/// Textures egui dropped this frame. Released once the paint jobs that may
/// still reference them have been recorded, or straight away on a skipped
/// frame.
#[must_use]
pub struct PendingFrees(Vec<TextureId>);

impl PendingFrees {
    pub fn release(self, sink: &mut impl TextureSink) {
        for id in &self.0 {
            sink.free(id);
        }
    }
}

/// Applies every texture upload in `delta`. egui sends the font atlas in
/// full only once and patches it afterwards, so this must run on every
/// frame, drawn or not.
pub fn upload_textures(sink: &mut impl TextureSink, delta: TexturesDelta) -> PendingFrees {
    for (id, image) in &delta.set {
        sink.update(*id, image);
    }
    PendingFrees(delta.free)
}

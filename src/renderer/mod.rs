pub mod frame;
pub mod gpu;
pub mod stats;
pub mod texture;

pub use frame::FrameRenderer;
pub use gpu::{GpuState, SceneResources, Viewport};
pub use stats::{FrameStats, SkipReason};
pub use texture::load_textures;

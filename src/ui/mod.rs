pub mod panels;
pub mod state;
pub mod textures;
pub mod theme;

pub use panels::{CONTROL_STRIP_HEIGHT, UiActions, draw_control_strip};
pub use state::RotationToggles;
pub use textures::{WgpuTextureSink, upload_textures};
pub use theme::apply_theme;

use std::path::PathBuf;

use thiserror::Error;

/// Startup failures. None of these are recoverable: the viewer refuses to
/// open rather than run with a partial scene.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("malformed asset: {0}")]
    MalformedAsset(String),

    #[error("failed to decode {asset}: {source}")]
    Json {
        asset: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode texture {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("part {0:?} has no material")]
    MissingMaterial(String),

    #[error("texture {0:?} was never loaded")]
    MissingTexture(String),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to acquire GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to build render pipeline: {0}")]
    Pipeline(String),

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("invalid config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ViewerError>;

//! Viewer configuration.
//!
//! Read from `$MINI_VIEWER_CONFIG` or `./mini_viewer.toml`. A missing file
//! means defaults; a file that exists but does not parse stops startup.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ViewerError};
use crate::ui::state::RotationFlags;

pub const CONFIG_ENV: &str = "MINI_VIEWER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "mini_viewer.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub assets: AssetConfig,
    pub window: WindowConfig,
    pub view: ViewConfig,
    pub rotation: RotationConfig,
    pub present: PresentConfig,
}

/// Asset locations, relative to `dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub dir: PathBuf,
    pub geometry: PathBuf,
    pub materials: PathBuf,
    pub textures: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("assets"),
            geometry: PathBuf::from("mini_geometry.json"),
            materials: PathBuf::from("mini_material.json"),
            textures: PathBuf::from("textures"),
        }
    }
}

impl AssetConfig {
    pub fn geometry_path(&self) -> PathBuf {
        self.dir.join(&self.geometry)
    }

    pub fn materials_path(&self) -> PathBuf {
        self.dir.join(&self.materials)
    }

    pub fn texture_dir(&self) -> PathBuf {
        self.dir.join(&self.textures)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Drawing surface size in logical pixels; the button strip sits below.
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Mini Viewer".to_string(),
            width: 600,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub eye: [f32; 3],
    pub center: [f32; 3],
    pub up: [f32; 3],
    /// Half-size of the orthographic box on every axis.
    pub ortho_extent: i32,
    pub initial_tilt_x_degrees: f32,
}

impl ViewConfig {
    /// Rejects views that would give a degenerate view or projection matrix.
    pub fn validate(&self) -> Result<()> {
        if self.ortho_extent <= 0 {
            return Err(invalid("view.ortho_extent", format!("{} is not positive", self.ortho_extent)));
        }
        if !self.initial_tilt_x_degrees.is_finite() {
            return Err(invalid("view.initial_tilt_x_degrees", "must be finite"));
        }

        let eye = Vec3::from_array(self.eye);
        let center = Vec3::from_array(self.center);
        let up = Vec3::from_array(self.up);
        for (field, v) in [("view.eye", eye), ("view.center", center), ("view.up", up)] {
            if !v.is_finite() {
                return Err(invalid(field, format!("{v} is not finite")));
            }
        }

        let forward = center - eye;
        if forward.length_squared() <= f32::EPSILON {
            return Err(invalid("view.center", "coincides with view.eye"));
        }
        if up.normalize_or_zero().cross(forward.normalize()).length_squared() <= 1e-6 {
            return Err(invalid("view.up", "is zero or parallel to the view direction"));
        }
        Ok(())
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, -1.0],
            center: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            ortho_extent: 200,
            initial_tilt_x_degrees: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Applied once per displayed frame, not per second.
    pub step_degrees: f32,
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        let flags = RotationFlags::default();
        Self {
            step_degrees: 0.5,
            x: flags.x,
            y: flags.y,
            z: flags.z,
        }
    }
}

impl RotationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.step_degrees.is_finite() {
            return Err(invalid("rotation.step_degrees", "must be finite"));
        }
        Ok(())
    }

    pub fn initial_flags(&self) -> RotationFlags {
        RotationFlags {
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentConfig {
    pub vsync: bool,
}

impl Default for PresentConfig {
    fn default() -> Self {
        Self { vsync: true }
    }
}

impl ViewerConfig {
    fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ViewerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|source| ViewerError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.view.validate()?;
        self.rotation.validate()
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ViewerError {
    ViewerError::InvalidSetting {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_scene() {
        let config = ViewerConfig::default();
        assert_eq!(config.view.ortho_extent, 200);
        assert_eq!(config.view.eye, [0.0, 0.0, -1.0]);
        assert_eq!(config.rotation.step_degrees, 0.5);
        assert_eq!(config.rotation.initial_flags(), RotationFlags::default());
        assert_eq!(
            config.assets.geometry_path(),
            Path::new("assets").join("mini_geometry.json")
        );
        assert_eq!(config.assets.texture_dir(), Path::new("assets").join("textures"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = ViewerConfig::from_toml_str(
            r#"
            [rotation]
            x = true
            step_degrees = 1.0

            [assets]
            dir = "/opt/mini"
            "#,
        )
        .unwrap();

        assert!(config.rotation.x);
        assert!(config.rotation.z);
        assert_eq!(config.rotation.step_degrees, 1.0);
        assert_eq!(config.assets.materials_path(), Path::new("/opt/mini/mini_material.json"));
        assert_eq!(config.window.width, 600);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(ViewerConfig::from_toml_str("[rotation]\nx = \"yes\"").is_err());
    }

    fn rejected_field(toml: &str) -> &'static str {
        let config = ViewerConfig::from_toml_str(toml).unwrap();
        match config.validate() {
            Err(ViewerError::InvalidSetting { field, .. }) => field,
            other => panic!("expected InvalidSetting for {toml:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(ViewerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_non_positive_extent_rejected() {
        assert_eq!(rejected_field("[view]\northo_extent = 0"), "view.ortho_extent");
        assert_eq!(rejected_field("[view]\northo_extent = -200"), "view.ortho_extent");
        assert_eq!(rejected_field("[view]\northo_extent = -2147483648"), "view.ortho_extent");
    }

    #[test]
    fn test_eye_on_center_rejected() {
        assert_eq!(rejected_field("[view]\neye = [0.0, 0.0, 0.0]"), "view.center");
    }

    #[test]
    fn test_up_along_view_direction_rejected() {
        assert_eq!(rejected_field("[view]\nup = [0.0, 0.0, 3.0]"), "view.up");
        assert_eq!(rejected_field("[view]\nup = [0.0, 0.0, 0.0]"), "view.up");
    }

    #[test]
    fn test_non_finite_step_rejected() {
        assert_eq!(rejected_field("[rotation]\nstep_degrees = nan"), "rotation.step_degrees");
        assert_eq!(rejected_field("[rotation]\nstep_degrees = inf"), "rotation.step_degrees");
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let path = std::env::temp_dir().join(format!("mini_viewer_bad_{}.toml", std::process::id()));
        std::fs::write(&path, "[view]\northo_extent = 0\n").unwrap();
        let result = ViewerConfig::load_from(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ViewerError::InvalidSetting { field: "view.ortho_extent", .. })));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = ViewerConfig::load_from(Path::new("/nonexistent/mini_viewer.toml")).unwrap();
        assert_eq!(config.window.height, 600);
    }
}

//! Viewer configuration loaded from YAML.
//!
//! Every field has a default, so an empty document (or no file at all) yields
//! the stock viewer: three meshes, a skybox, a 1024x768 window.
//!
//! # Invariants
//! - A validated config always selects an existing model.
//! - A configured skybox always names all six faces.

use crate::types::DrawProperties;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on the fixed update rate. Higher rates round the step towards
/// zero and drain thousands of steps per frame.
pub const MAX_UPDATES_PER_SECOND: f32 = 10_000.0;

/// Errors from loading or validating a config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub resizable: bool,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "meshview".into(),
            resizable: false,
            vsync: true,
        }
    }
}

/// Initial camera pose and controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    /// Degrees.
    pub yaw: f32,
    /// Degrees.
    pub pitch: f32,
    /// World units per second.
    pub speed: f32,
    /// Degrees per pixel of pointer travel.
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        // Faces the origin from the front-right, slightly above it.
        Self {
            position: Vec3::new(1.7, 1.3, 4.0),
            yaw: 240.0,
            pitch: -15.0,
            speed: 2.5,
            sensitivity: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Fixed simulation updates per second.
    pub updates_per_second: f32,
    /// Upper bound on the elapsed time accepted for one frame.
    pub max_frame_time_ms: Option<u64>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            updates_per_second: 60.0,
            max_frame_time_ms: Some(250),
        }
    }
}

/// Paths of the six cubemap faces, relative to the asset root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyboxConfig {
    pub right: PathBuf,
    pub left: PathBuf,
    pub top: PathBuf,
    pub bottom: PathBuf,
    pub front: PathBuf,
    pub back: PathBuf,
}

impl Default for SkyboxConfig {
    fn default() -> Self {
        Self {
            right: "skybox/right.png".into(),
            left: "skybox/left.png".into(),
            top: "skybox/top.png".into(),
            bottom: "skybox/bottom.png".into(),
            front: "skybox/front.png".into(),
            back: "skybox/back.png".into(),
        }
    }
}

impl SkyboxConfig {
    /// Faces in cubemap layer order: right, left, top, bottom, front, back.
    pub fn faces(&self) -> [&Path; 6] {
        [
            self.right.as_path(),
            self.left.as_path(),
            self.top.as_path(),
            self.bottom.as_path(),
            self.front.as_path(),
            self.back.as_path(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory every other asset path is resolved against.
    pub root: PathBuf,
    /// Ordered model list; the settings panel selects by index.
    pub models: Vec<PathBuf>,
    /// `None` disables the skybox entirely.
    pub skybox: Option<SkyboxConfig>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "assets".into(),
            models: vec![
                "meshes/cube.obj".into(),
                "meshes/sphere.obj".into(),
                "meshes/torus.obj".into(),
            ],
            skybox: Some(SkyboxConfig::default()),
        }
    }
}

impl AssetConfig {
    /// Resolve a path against the asset root.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub timing: TimingConfig,
    pub assets: AssetConfig,
    pub draw: DrawProperties,
}

impl ViewerConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded viewer config");
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to `null`, not an empty mapping.
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML, e.g. to write out a starter config.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be positive, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        let rate = self.timing.updates_per_second;
        if !(rate > 0.0 && rate <= MAX_UPDATES_PER_SECOND) {
            return Err(ConfigError::Invalid(format!(
                "updates_per_second must be in (0, {MAX_UPDATES_PER_SECOND}], got {rate}"
            )));
        }
        if self.assets.models.is_empty() {
            return Err(ConfigError::Invalid("at least one model is required".into()));
        }
        if self.draw.selected_model_index >= self.assets.models.len() {
            return Err(ConfigError::Invalid(format!(
                "selected_model_index {} is out of range for {} models",
                self.draw.selected_model_index,
                self.assets.models.len()
            )));
        }
        if !(self.draw.fov > 0.0 && self.draw.fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "fov must be in (0, 180) degrees, got {}",
                self.draw.fov
            )));
        }
        if let Some(skybox) = &self.assets.skybox {
            if skybox.faces().iter().any(|p| p.as_os_str().is_empty()) {
                return Err(ConfigError::Invalid(
                    "skybox needs all six face paths".into(),
                ));
            }
        }
        Ok(())
    }

    /// Length of one fixed simulation step.
    pub fn fixed_timestep(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.timing.updates_per_second))
    }

    pub fn max_frame_time(&self) -> Option<Duration> {
        self.timing.max_frame_time_ms.map(Duration::from_millis)
    }
}

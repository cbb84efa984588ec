//! Shared types for the meshview workspace: draw settings and viewer config.

pub mod config;
mod types;

pub use config::{
    AssetConfig, CameraConfig, ConfigError, SkyboxConfig, TimingConfig, ViewerConfig,
    WindowConfig,
};
pub use types::{DrawProperties, ShadingMode};

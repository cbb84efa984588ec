use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Which lighting terms the model shader evaluates for a draw call.
///
/// The ambient term is always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShadingMode {
    pub diffuse: bool,
    pub specular: bool,
}

impl Default for ShadingMode {
    fn default() -> Self {
        Self {
            diffuse: true,
            specular: true,
        }
    }
}

/// Per-frame render configuration.
///
/// Owned by the application, edited by the settings panel, read-only to the
/// renderer. Angles are in degrees, colors are linear RGB in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawProperties {
    pub background_color: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Euler rotation of the model around X, Y and Z, in degrees.
    pub model_rotation: Vec3,
    pub model_color: Vec3,
    /// Direction the light travels in world space.
    pub light_direction: Vec3,
    pub diffuse_enabled: bool,
    pub specular_enabled: bool,
    pub wireframe_mode_enabled: bool,
    pub skybox_enabled: bool,
    /// Index into the ordered model collection of the scene.
    pub selected_model_index: usize,
}

impl Default for DrawProperties {
    fn default() -> Self {
        Self {
            background_color: Vec3::new(0.1, 0.1, 0.1),
            fov: 60.0,
            model_rotation: Vec3::ZERO,
            model_color: Vec3::new(0.9, 0.6, 0.2),
            light_direction: Vec3::new(-0.5, -1.0, -0.3),
            diffuse_enabled: true,
            specular_enabled: true,
            wireframe_mode_enabled: false,
            skybox_enabled: true,
            selected_model_index: 0,
        }
    }
}

impl DrawProperties {
    /// Shading terms selected by the diffuse/specular toggles.
    pub fn shading_mode(&self) -> ShadingMode {
        ShadingMode {
            diffuse: self.diffuse_enabled,
            specular: self.specular_enabled,
        }
    }

    /// Select a model by index, refusing indices outside `0..model_count`.
    ///
    /// Returns whether the selection changed.
    pub fn select_model(&mut self, index: usize, model_count: usize) -> bool {
        if index >= model_count || index == self.selected_model_index {
            return false;
        }
        self.selected_model_index = index;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_viewer_startup() {
        let props = DrawProperties::default();
        assert_eq!(props.background_color, Vec3::splat(0.1));
        assert_eq!(props.fov, 60.0);
        assert!(props.skybox_enabled);
        assert!(!props.wireframe_mode_enabled);
        assert_eq!(props.selected_model_index, 0);
    }

    #[test]
    fn shading_mode_follows_toggles() {
        let mut props = DrawProperties::default();
        props.specular_enabled = false;
        assert_eq!(
            props.shading_mode(),
            ShadingMode {
                diffuse: true,
                specular: false
            }
        );
    }

    #[test]
    fn select_model_rejects_out_of_range() {
        let mut props = DrawProperties::default();
        assert!(!props.select_model(3, 3));
        assert_eq!(props.selected_model_index, 0);
        assert!(props.select_model(2, 3));
        assert_eq!(props.selected_model_index, 2);
        assert!(!props.select_model(2, 3));
    }
}

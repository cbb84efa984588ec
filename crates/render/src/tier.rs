//! Capability tiers.
//!
//! The tier is fixed at build time by the `gles3` cargo feature. It decides
//! which shader set is loaded and how the shading mode reaches the fragment
//! stage.

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityTier {
    /// OpenGL 4.3 core: shader subroutines and polygon mode.
    Gl43Core,
    /// OpenGL ES 3.0: uniform branching, fill only.
    Gles30,
}

/// Which shader pair to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderPurpose {
    Model,
    Skybox,
}

impl ShaderPurpose {
    pub fn name(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Skybox => "skybox",
        }
    }
}

/// Vertex and fragment source locations for one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl CapabilityTier {
    /// The tier this build was compiled for.
    pub const ACTIVE: Self = if cfg!(feature = "gles3") {
        Self::Gles30
    } else {
        Self::Gl43Core
    };

    pub fn supports_subroutines(self) -> bool {
        matches!(self, Self::Gl43Core)
    }

    pub fn supports_polygon_mode(self) -> bool {
        matches!(self, Self::Gl43Core)
    }

    pub fn is_gles(self) -> bool {
        matches!(self, Self::Gles30)
    }

    /// Context version to request, as (major, minor).
    pub fn context_version(self) -> (u8, u8) {
        match self {
            Self::Gl43Core => (4, 3),
            Self::Gles30 => (3, 0),
        }
    }

    pub fn shader_suffix(self) -> &'static str {
        match self {
            Self::Gl43Core => "gl4",
            Self::Gles30 => "gles3",
        }
    }

    /// `<dir>/<purpose>_<suffix>.{vert,frag}.glsl`
    pub fn shader_paths(self, dir: &Path, purpose: ShaderPurpose) -> ShaderPaths {
        let stem = format!("{}_{}", purpose.name(), self.shader_suffix());
        ShaderPaths {
            vertex: dir.join(format!("{stem}.vert.glsl")),
            fragment: dir.join(format!("{stem}.frag.glsl")),
        }
    }
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gl43Core => "OpenGL 4.3 core",
            Self::Gles30 => "OpenGL ES 3.0",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_paths_follow_naming() {
        let paths = CapabilityTier::Gles30.shader_paths(Path::new("assets/shaders"), ShaderPurpose::Skybox);
        assert_eq!(paths.vertex, PathBuf::from("assets/shaders/skybox_gles3.vert.glsl"));
        assert_eq!(paths.fragment, PathBuf::from("assets/shaders/skybox_gles3.frag.glsl"));
    }

    #[test]
    fn only_core_tier_has_subroutines_and_polygon_mode() {
        assert!(CapabilityTier::Gl43Core.supports_subroutines());
        assert!(CapabilityTier::Gl43Core.supports_polygon_mode());
        assert!(!CapabilityTier::Gles30.supports_subroutines());
        assert!(!CapabilityTier::Gles30.supports_polygon_mode());
    }

    #[test]
    fn active_tier_matches_feature() {
        assert_eq!(CapabilityTier::ACTIVE.is_gles(), cfg!(feature = "gles3"));
    }
}

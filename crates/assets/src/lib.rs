//! Asset loading for the viewer: OBJ meshes and cubemap face images.
//!
//! Everything here is CPU-side. GPU upload lives in `meshview-render`, which
//! consumes these types without touching files or decoders.

mod cubemap;
mod mesh;

pub use cubemap::{CubeFace, FaceImage};
pub use mesh::{MeshData, MeshVertex};

use std::path::PathBuf;

/// Errors from asset loading.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load OBJ {}: {source}", path.display())]
    Obj {
        path: PathBuf,
        source: tobj::LoadError,
    },
    #[error("mesh {} has no triangles", .0.display())]
    EmptyMesh(PathBuf),
    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelCount { expected: usize, actual: usize },
}

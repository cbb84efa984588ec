//! Cubemap skybox.
//!
//! # Invariants
//! - A [`Skybox`] always has all six faces, square and of equal size.
//! - A failed build leaves nothing allocated.

use crate::device::{
    GraphicsApi, TextureFilter, TextureId, TextureParameter, TextureTarget, TextureWrap,
    VertexArrayId, VertexAttribute,
};
use crate::handle::GpuResource;
use crate::resource::{GpuMesh, ResourceError};
use meshview_assets::{CubeFace, FaceImage};
use meshview_common::AssetConfig;
use std::path::PathBuf;
use std::rc::Rc;

pub const SKYBOX_INDEX_COUNT: usize = 36;
pub const SKYBOX_TEXTURE_UNIT: u32 = 0;

#[rustfmt::skip]
const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0],
    [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0],
];

#[rustfmt::skip]
const CUBE_INDICES: [u32; SKYBOX_INDEX_COUNT] = [
    0, 1, 2, 2, 3, 0, // -Z
    4, 5, 6, 6, 7, 4, // +Z
    4, 0, 3, 3, 7, 4, // -X
    1, 5, 6, 6, 2, 1, // +X
    4, 5, 1, 1, 0, 4, // -Y
    3, 2, 6, 6, 7, 3, // +Y
];

const SKYBOX_ATTRIBUTES: [VertexAttribute; 1] = [VertexAttribute {
    location: 0,
    components: 3,
    stride: 12,
    offset: 0,
}];

/// Cube geometry plus a cubemap texture.
pub struct Skybox<A: GraphicsApi> {
    mesh: GpuMesh<A>,
    texture: GpuResource<A, TextureId>,
}

impl<A: GraphicsApi> std::fmt::Debug for Skybox<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skybox")
            .field("texture", &self.texture())
            .field("index_count", &self.index_count())
            .finish()
    }
}

impl<A: GraphicsApi> Skybox<A> {
    pub fn builder() -> SkyboxBuilder {
        SkyboxBuilder::new()
    }

    /// Upload six decoded faces, given in [`CubeFace::ALL`] order.
    pub fn from_faces(api: &Rc<A>, faces: &[FaceImage; 6]) -> Result<Self, ResourceError> {
        let size = check_faces(faces)?;

        let mesh = GpuMesh::upload(
            api,
            bytemuck::cast_slice(&CUBE_CORNERS),
            &SKYBOX_ATTRIBUTES,
            &CUBE_INDICES,
        )?;
        let texture = GpuResource::texture(api)?;

        api.bind_texture(TextureTarget::CubeMap, Some(texture.handle()));
        for (face, image) in CubeFace::ALL.into_iter().zip(faces) {
            api.tex_image_cube_face(face, image.width, image.height, &image.pixels);
        }
        for parameter in [
            TextureParameter::MinFilter(TextureFilter::Linear),
            TextureParameter::MagFilter(TextureFilter::Linear),
            TextureParameter::WrapS(TextureWrap::ClampToEdge),
            TextureParameter::WrapT(TextureWrap::ClampToEdge),
            TextureParameter::WrapR(TextureWrap::ClampToEdge),
        ] {
            api.tex_parameter(TextureTarget::CubeMap, parameter);
        }
        api.bind_texture(TextureTarget::CubeMap, None);

        tracing::info!(face_size = size, "uploaded skybox");
        Ok(Self { mesh, texture })
    }

    pub fn vertex_array(&self) -> VertexArrayId {
        self.mesh.vertex_array()
    }

    pub fn texture(&self) -> TextureId {
        self.texture.handle()
    }

    pub fn index_count(&self) -> usize {
        self.mesh.index_count()
    }
}

fn check_faces(faces: &[FaceImage; 6]) -> Result<u32, ResourceError> {
    let expected = faces[0].width;
    for (face, image) in CubeFace::ALL.into_iter().zip(faces) {
        if !image.is_square() {
            return Err(ResourceError::NonSquareFace {
                face,
                width: image.width,
                height: image.height,
            });
        }
        if image.width != expected {
            return Err(ResourceError::FaceSizeMismatch {
                face,
                size: image.width,
                expected,
            });
        }
    }
    Ok(expected)
}

/// Collects the six face paths of a skybox.
#[derive(Debug, Clone, Default)]
pub struct SkyboxBuilder {
    faces: [Option<PathBuf>; 6],
}

impl SkyboxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-filled from config, with paths resolved against the root.
    /// Returns `None` when the config disables the skybox.
    pub fn from_config(assets: &AssetConfig) -> Option<Self> {
        let skybox = assets.skybox.as_ref()?;
        let builder = CubeFace::ALL
            .into_iter()
            .zip(skybox.faces())
            .fold(Self::new(), |builder, (face, path)| {
                builder.face(face, assets.resolve(path))
            });
        Some(builder)
    }

    pub fn face(mut self, face: CubeFace, path: impl Into<PathBuf>) -> Self {
        self.faces[face.layer() as usize] = Some(path.into());
        self
    }

    pub fn right(self, path: impl Into<PathBuf>) -> Self {
        self.face(CubeFace::Right, path)
    }

    pub fn left(self, path: impl Into<PathBuf>) -> Self {
        self.face(CubeFace::Left, path)
    }

    pub fn top(self, path: impl Into<PathBuf>) -> Self {
        self.face(CubeFace::Top, path)
    }

    pub fn bottom(self, path: impl Into<PathBuf>) -> Self {
        self.face(CubeFace::Bottom, path)
    }

    pub fn front(self, path: impl Into<PathBuf>) -> Self {
        self.face(CubeFace::Front, path)
    }

    pub fn back(self, path: impl Into<PathBuf>) -> Self {
        self.face(CubeFace::Back, path)
    }

    /// Faces that have not been set, in layer order.
    pub fn missing_faces(&self) -> Vec<CubeFace> {
        CubeFace::ALL
            .into_iter()
            .filter(|face| self.faces[face.layer() as usize].is_none())
            .collect()
    }

    /// Check completeness, decode every face, then upload.
    pub fn build<A: GraphicsApi>(self, api: &Rc<A>) -> Result<Skybox<A>, ResourceError> {
        if let Some(&face) = self.missing_faces().first() {
            return Err(ResourceError::MissingFace(face));
        }
        let [right, left, top, bottom, front, back] = self
            .faces
            .map(|path| FaceImage::load(path.unwrap_or_default()));
        Skybox::from_faces(api, &[right?, left?, top?, bottom?, front?, back?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessApi, ObjectKind};

    fn solid_faces(size: u32) -> [FaceImage; 6] {
        std::array::from_fn(|i| FaceImage::solid(size, [i as u8 * 40, 0, 0, 255]))
    }

    fn write_faces(dir: &std::path::Path, size: u32) -> SkyboxBuilder {
        CubeFace::ALL.into_iter().fold(SkyboxBuilder::new(), |b, face| {
            let path = dir.join(format!("{face}.png"));
            image::RgbaImage::from_pixel(size, size, image::Rgba([1, 2, 3, 255]))
                .save(&path)
                .unwrap();
            b.face(face, path)
        })
    }

    #[test]
    fn missing_face_fails_before_touching_the_gpu() {
        let api = Rc::new(HeadlessApi::new());
        let builder = SkyboxBuilder::new()
            .right("r.png")
            .left("l.png")
            .top("t.png")
            .bottom("b.png")
            .front("f.png");
        assert_eq!(builder.missing_faces(), vec![CubeFace::Back]);

        let err = builder.build(&api).unwrap_err();
        assert!(matches!(err, ResourceError::MissingFace(CubeFace::Back)));
        assert_eq!(api.allocations(), 0);
    }

    #[test]
    fn builds_from_image_files() {
        let dir = tempfile::tempdir().unwrap();
        let api = Rc::new(HeadlessApi::new());
        let skybox = write_faces(dir.path(), 4).build(&api).unwrap();

        assert_eq!(skybox.index_count(), SKYBOX_INDEX_COUNT);
        assert_eq!(api.texture_faces(skybox.texture()), CubeFace::ALL.to_vec());
        assert_eq!(api.live_count(ObjectKind::Texture), 1);
        assert!(format!("{skybox:?}").contains("index_count: 36"));
        drop(skybox);
        assert_eq!(api.live_objects(), 0);
    }

    #[test]
    fn undecodable_face_is_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let builder = write_faces(dir.path(), 4);
        std::fs::write(dir.path().join("top.png"), b"garbage").unwrap();
        let api = Rc::new(HeadlessApi::new());
        let err = builder.build(&api).unwrap_err();
        assert!(matches!(err, ResourceError::Asset(_)));
        assert_eq!(api.allocations(), 0);
    }

    #[test]
    fn mismatched_faces_are_rejected() {
        let api = Rc::new(HeadlessApi::new());
        let mut faces = solid_faces(8);
        faces[4] = FaceImage::solid(4, [0, 0, 0, 255]);
        let err = Skybox::from_faces(&api, &faces).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::FaceSizeMismatch { face: CubeFace::Front, size: 4, expected: 8 }
        ));

        let mut faces = solid_faces(8);
        faces[2] = FaceImage::from_rgba(8, 4, vec![0; 8 * 4 * 4]).unwrap();
        let err = Skybox::from_faces(&api, &faces).unwrap_err();
        assert!(matches!(err, ResourceError::NonSquareFace { face: CubeFace::Top, .. }));
        assert_eq!(api.allocations(), 0);
    }

    #[test]
    fn allocation_failure_mid_upload_releases_everything() {
        let api = Rc::new(HeadlessApi::new());
        // Mesh (three objects) succeeds, texture fails.
        api.fail_allocations_after(3);
        let err = Skybox::from_faces(&api, &solid_faces(2)).unwrap_err();
        assert!(matches!(err, ResourceError::Gpu(_)));
        assert_eq!(api.live_objects(), 0);
        assert_eq!(api.released_count(), 3);
        assert!(api.double_releases().is_empty());
    }

    #[test]
    fn from_config_resolves_paths() {
        let assets = AssetConfig::default();
        let builder = SkyboxBuilder::from_config(&assets).unwrap();
        assert!(builder.missing_faces().is_empty());
        assert_eq!(
            builder.faces[CubeFace::Top.layer() as usize],
            Some(PathBuf::from("assets/skybox/top.png"))
        );

        let disabled = AssetConfig {
            skybox: None,
            ..AssetConfig::default()
        };
        assert!(SkyboxBuilder::from_config(&disabled).is_none());
    }
}

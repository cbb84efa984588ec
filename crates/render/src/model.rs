use crate::device::{GraphicsApi, VertexArrayId, VertexAttribute};
use crate::resource::{GpuMesh, ResourceError};
use meshview_assets::{MeshData, MeshVertex};
use std::mem::{offset_of, size_of};
use std::path::Path;
use std::rc::Rc;

const STRIDE: u32 = size_of::<MeshVertex>() as u32;

/// Position at location 0, normal at location 1.
pub const MODEL_ATTRIBUTES: [VertexAttribute; 2] = [
    VertexAttribute {
        location: 0,
        components: 3,
        stride: STRIDE,
        offset: offset_of!(MeshVertex, position) as u32,
    },
    VertexAttribute {
        location: 1,
        components: 3,
        stride: STRIDE,
        offset: offset_of!(MeshVertex, normal) as u32,
    },
];

/// A mesh resident on the GPU.
pub struct Model<A: GraphicsApi> {
    name: String,
    mesh: GpuMesh<A>,
}

impl<A: GraphicsApi> Model<A> {
    pub fn from_mesh(api: &Rc<A>, mesh: &MeshData) -> Result<Self, ResourceError> {
        let gpu = GpuMesh::upload(api, mesh.vertex_bytes(), &MODEL_ATTRIBUTES, &mesh.indices)?;
        tracing::debug!(
            name = %mesh.name,
            indices = gpu.index_count(),
            "uploaded model"
        );
        Ok(Self {
            name: mesh.name.clone(),
            mesh: gpu,
        })
    }

    /// Load an OBJ file and upload it.
    pub fn load(api: &Rc<A>, path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let mesh = MeshData::load_obj(path)?;
        Self::from_mesh(api, &mesh)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_array(&self) -> VertexArrayId {
        self.mesh.vertex_array()
    }

    pub fn index_count(&self) -> usize {
        self.mesh.index_count()
    }
}

impl<A: GraphicsApi> std::fmt::Debug for Model<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("index_count", &self.index_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessApi, ObjectKind};
    use std::io::Write;

    #[test]
    fn attributes_match_vertex_layout() {
        assert_eq!(MODEL_ATTRIBUTES[0].offset, 0);
        assert_eq!(MODEL_ATTRIBUTES[1].offset, 12);
        assert_eq!(STRIDE, 24);
    }

    #[test]
    fn from_mesh_owns_three_objects() {
        let api = Rc::new(HeadlessApi::new());
        let model = Model::from_mesh(&api, &MeshData::unit_cube()).unwrap();
        assert_eq!(model.index_count(), 36);
        assert_eq!(model.name(), "unit_cube");
        assert_eq!(api.live_count(ObjectKind::VertexArray), 1);
        assert_eq!(api.live_count(ObjectKind::Buffer), 2);

        drop(model);
        assert_eq!(api.live_objects(), 0);
        assert!(api.double_releases().is_empty());
    }

    #[test]
    fn partial_upload_failure_releases_acquired_objects() {
        let api = Rc::new(HeadlessApi::new());
        // Vertex array and vertex buffer succeed, index buffer fails.
        api.fail_allocations_after(2);
        let err = Model::from_mesh(&api, &MeshData::unit_cube()).unwrap_err();
        assert!(matches!(err, ResourceError::Gpu(_)));
        assert_eq!(api.live_objects(), 0);
        assert_eq!(api.released_count(), 2);
    }

    #[test]
    fn load_reads_obj() {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let api = Rc::new(HeadlessApi::new());
        let model = Model::load(&api, file.path()).unwrap();
        assert_eq!(model.index_count(), 3);
    }

    #[test]
    fn load_missing_file_is_asset_error() {
        let api = Rc::new(HeadlessApi::new());
        let err = Model::load(&api, "/nonexistent/bunny.obj").unwrap_err();
        assert!(matches!(err, ResourceError::Asset(_)));
        assert_eq!(api.live_objects(), 0);
    }
}

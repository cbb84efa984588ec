//! Shared GPU geometry upload for models and the skybox.

use crate::device::{
    BufferId, BufferTarget, GpuError, GraphicsApi, VertexArrayId, VertexAttribute,
};
use crate::handle::GpuResource;
use meshview_assets::{AssetError, CubeFace};
use std::rc::Rc;

/// Errors building a renderable resource.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("skybox face `{0}` is not set")]
    MissingFace(CubeFace),
    #[error("skybox face `{face}` is {width}x{height}, faces must be square")]
    NonSquareFace {
        face: CubeFace,
        width: u32,
        height: u32,
    },
    #[error("skybox face `{face}` is {size}px wide, expected {expected}px like the first face")]
    FaceSizeMismatch {
        face: CubeFace,
        size: u32,
        expected: u32,
    },
}

/// Vertex array plus its vertex and index buffers.
///
/// Fields drop in declaration order, so the vertex array goes before the
/// buffers it references.
pub(crate) struct GpuMesh<A: GraphicsApi> {
    vertex_array: GpuResource<A, VertexArrayId>,
    _vertex_buffer: GpuResource<A, BufferId>,
    _index_buffer: GpuResource<A, BufferId>,
    index_count: usize,
}

impl<A: GraphicsApi> GpuMesh<A> {
    pub(crate) fn upload(
        api: &Rc<A>,
        vertex_bytes: &[u8],
        attributes: &[VertexAttribute],
        indices: &[u32],
    ) -> Result<Self, GpuError> {
        let vertex_array = GpuResource::vertex_array(api)?;
        let vertex_buffer = GpuResource::buffer(api)?;
        let index_buffer = GpuResource::buffer(api)?;

        api.bind_vertex_array(Some(vertex_array.handle()));
        api.bind_buffer(BufferTarget::Array, Some(vertex_buffer.handle()));
        api.buffer_data(BufferTarget::Array, vertex_bytes);
        api.bind_buffer(BufferTarget::ElementArray, Some(index_buffer.handle()));
        api.buffer_data(BufferTarget::ElementArray, bytemuck::cast_slice(indices));
        for &attribute in attributes {
            api.vertex_attribute(attribute);
        }
        api.bind_vertex_array(None);
        api.bind_buffer(BufferTarget::Array, None);

        Ok(Self {
            vertex_array,
            _vertex_buffer: vertex_buffer,
            _index_buffer: index_buffer,
            index_count: indices.len(),
        })
    }

    pub(crate) fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array.handle()
    }

    pub(crate) fn index_count(&self) -> usize {
        self.index_count
    }
}

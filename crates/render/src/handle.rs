//! Owned GPU objects.
//!
//! # Invariants
//! - A [`GpuResource`] is the only owner of its handle. It is neither `Clone`
//!   nor `Copy`; moving it moves ownership.
//! - The handle is released exactly once, when the owner drops.

use crate::device::{
    BufferId, GpuError, GraphicsApi, ProgramId, ShaderId, ShaderStage, TextureId, VertexArrayId,
};
use std::fmt;
use std::rc::Rc;

/// A GPU object handle that knows how to release itself.
pub trait GpuObject: Copy + fmt::Debug {
    const KIND: &'static str;

    fn release<A: GraphicsApi + ?Sized>(self, api: &A);
}

impl GpuObject for BufferId {
    const KIND: &'static str = "buffer";

    fn release<A: GraphicsApi + ?Sized>(self, api: &A) {
        api.delete_buffer(self);
    }
}

impl GpuObject for VertexArrayId {
    const KIND: &'static str = "vertex array";

    fn release<A: GraphicsApi + ?Sized>(self, api: &A) {
        api.delete_vertex_array(self);
    }
}

impl GpuObject for TextureId {
    const KIND: &'static str = "texture";

    fn release<A: GraphicsApi + ?Sized>(self, api: &A) {
        api.delete_texture(self);
    }
}

impl GpuObject for ShaderId {
    const KIND: &'static str = "shader";

    fn release<A: GraphicsApi + ?Sized>(self, api: &A) {
        api.delete_shader(self);
    }
}

impl GpuObject for ProgramId {
    const KIND: &'static str = "program";

    fn release<A: GraphicsApi + ?Sized>(self, api: &A) {
        api.delete_program(self);
    }
}

/// Owning token for one GPU object.
pub struct GpuResource<A: GraphicsApi, H: GpuObject> {
    api: Rc<A>,
    handle: H,
}

impl<A: GraphicsApi, H: GpuObject> GpuResource<A, H> {
    /// Take ownership of an already-created handle.
    pub fn from_raw(api: &Rc<A>, handle: H) -> Self {
        Self {
            api: Rc::clone(api),
            handle,
        }
    }

    pub fn handle(&self) -> H {
        self.handle
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

impl<A: GraphicsApi> GpuResource<A, BufferId> {
    pub fn buffer(api: &Rc<A>) -> Result<Self, GpuError> {
        Ok(Self::from_raw(api, api.create_buffer()?))
    }
}

impl<A: GraphicsApi> GpuResource<A, VertexArrayId> {
    pub fn vertex_array(api: &Rc<A>) -> Result<Self, GpuError> {
        Ok(Self::from_raw(api, api.create_vertex_array()?))
    }
}

impl<A: GraphicsApi> GpuResource<A, TextureId> {
    pub fn texture(api: &Rc<A>) -> Result<Self, GpuError> {
        Ok(Self::from_raw(api, api.create_texture()?))
    }
}

impl<A: GraphicsApi> GpuResource<A, ShaderId> {
    pub fn shader(api: &Rc<A>, stage: ShaderStage) -> Result<Self, GpuError> {
        Ok(Self::from_raw(api, api.create_shader(stage)?))
    }
}

impl<A: GraphicsApi> GpuResource<A, ProgramId> {
    pub fn program(api: &Rc<A>) -> Result<Self, GpuError> {
        Ok(Self::from_raw(api, api.create_program()?))
    }
}

impl<A: GraphicsApi, H: GpuObject> Drop for GpuResource<A, H> {
    fn drop(&mut self) {
        tracing::trace!(kind = H::KIND, handle = ?self.handle, "releasing GPU object");
        self.handle.release(&*self.api);
    }
}

impl<A: GraphicsApi, H: GpuObject> fmt::Debug for GpuResource<A, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuResource")
            .field("kind", &H::KIND)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessApi, ObjectKind};

    #[test]
    fn drop_releases_once() {
        let api = Rc::new(HeadlessApi::new());
        let buffer = GpuResource::buffer(&api).unwrap();
        assert_eq!(api.live_count(ObjectKind::Buffer), 1);
        drop(buffer);
        assert_eq!(api.live_count(ObjectKind::Buffer), 0);
        assert!(api.double_releases().is_empty());
    }

    #[test]
    fn move_transfers_ownership_without_double_free() {
        let api = Rc::new(HeadlessApi::new());
        let texture = GpuResource::texture(&api).unwrap();
        let id = texture.handle();

        let moved = texture;
        let holder = vec![moved];
        assert_eq!(holder[0].handle(), id);
        assert_eq!(api.live_count(ObjectKind::Texture), 1);

        drop(holder);
        assert_eq!(api.live_count(ObjectKind::Texture), 0);
        assert_eq!(api.released_count(), 1);
        assert!(api.double_releases().is_empty());
    }

    #[test]
    fn failed_allocation_yields_nothing() {
        let api = Rc::new(HeadlessApi::new());
        api.fail_allocations_after(0);
        let err = GpuResource::vertex_array(&api).unwrap_err();
        assert!(matches!(err, GpuError::Allocation("vertex array")));
        assert_eq!(api.live_objects(), 0);
    }
}

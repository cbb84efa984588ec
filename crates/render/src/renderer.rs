use crate::camera::Camera;
use crate::device::{
    BlendFactor, Capability, DepthFunc, GraphicsApi, PolygonMode, TextureTarget, Viewport,
};
use crate::model::Model;
use crate::shader::{ShaderError, ShaderProgram};
use crate::shading::{ShadingModeSelector, selector_for_tier};
use crate::skybox::{SKYBOX_TEXTURE_UNIT, Skybox};
use crate::tier::{CapabilityTier, ShaderPurpose};
use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use meshview_common::DrawProperties;
use std::path::Path;
use std::rc::Rc;

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

/// Model transform from Euler angles in degrees, composed as Z * Y * X.
pub fn model_matrix(rotation_degrees: Vec3) -> Mat4 {
    let r = rotation_degrees * (std::f32::consts::PI / 180.0);
    Mat4::from_quat(Quat::from_euler(EulerRot::ZYX, r.z, r.y, r.x))
}

/// Inverse-transpose of the upper 3x3, for transforming normals.
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    Mat3::from_mat4(*model).inverse().transpose()
}

/// View with translation removed, so the skybox stays centered on the eye.
pub fn skybox_view(view: &Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(*view))
}

/// Per-frame draw orchestration.
///
/// The renderer never mutates the camera or the draw properties; both are
/// borrowed for the duration of a call.
pub struct Renderer<A: GraphicsApi> {
    api: Rc<A>,
    tier: CapabilityTier,
    model_shader: ShaderProgram<A>,
    skybox_shader: ShaderProgram<A>,
    shading: Box<dyn ShadingModeSelector<A>>,
    projection: Mat4,
    frames: u64,
}

impl<A: GraphicsApi> Renderer<A> {
    pub fn new(
        api: Rc<A>,
        tier: CapabilityTier,
        model_shader: ShaderProgram<A>,
        skybox_shader: ShaderProgram<A>,
    ) -> Self {
        let shading = selector_for_tier(tier);
        tracing::info!(%tier, shading = shading.name(), "renderer ready");
        Self {
            api,
            tier,
            model_shader,
            skybox_shader,
            shading,
            projection: Mat4::IDENTITY,
            frames: 0,
        }
    }

    /// Load the tier's model and skybox programs from `dir`.
    pub fn from_shader_dir(
        api: Rc<A>,
        tier: CapabilityTier,
        dir: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let dir = dir.as_ref();
        let model = ShaderProgram::from_paths(&api, &tier.shader_paths(dir, ShaderPurpose::Model))?;
        let skybox =
            ShaderProgram::from_paths(&api, &tier.shader_paths(dir, ShaderPurpose::Skybox))?;
        Ok(Self::new(api, tier, model, skybox))
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    /// Projection computed by the last [`Renderer::prepare_draw`].
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Start a frame: viewport, baseline state, projection and clear.
    ///
    /// Baseline state is re-established every frame because other painters
    /// (the settings panel) change global state between frames.
    pub fn prepare_draw(&mut self, viewport: Viewport, props: &DrawProperties) -> Frame<'_, A> {
        let api = &*self.api;
        api.viewport(viewport);
        api.set_capability(Capability::DepthTest, true);
        api.depth_func(DepthFunc::Less);
        api.set_capability(Capability::Blend, true);
        api.blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        if self.tier.supports_polygon_mode() {
            api.polygon_mode(PolygonMode::Fill);
        }

        self.projection = Mat4::perspective_rh_gl(
            props.fov.to_radians(),
            viewport.aspect_ratio(),
            NEAR_PLANE,
            FAR_PLANE,
        );

        let bg = props.background_color;
        api.clear_color([bg.x, bg.y, bg.z, 1.0]);
        api.clear_color_and_depth();

        self.frames += 1;
        Frame { renderer: self }
    }
}

/// A prepared frame. Opaque draws go through [`Frame::draw_model`];
/// [`Frame::draw_skybox`] consumes the frame, so nothing can follow it.
pub struct Frame<'r, A: GraphicsApi> {
    renderer: &'r mut Renderer<A>,
}

impl<A: GraphicsApi> Frame<'_, A> {
    pub fn projection(&self) -> Mat4 {
        self.renderer.projection
    }

    pub fn draw_model(&mut self, model: &Model<A>, camera: &Camera, props: &DrawProperties) {
        let Renderer {
            api,
            tier,
            model_shader,
            shading,
            projection,
            ..
        } = &mut *self.renderer;

        model_shader.use_program();
        api.bind_vertex_array(Some(model.vertex_array()));

        let model_transform = model_matrix(props.model_rotation);
        let mvp = *projection * camera.view_matrix() * model_transform;
        model_shader.set_uniform("u_model", model_transform);
        model_shader.set_uniform("u_mvp", mvp);
        model_shader.set_uniform("u_normalMatrix", normal_matrix(&model_transform));
        model_shader.set_uniform("u_color", props.model_color);
        model_shader.set_uniform("u_light.direction", props.light_direction);
        model_shader.set_uniform("u_viewPos", camera.position());

        shading.apply(model_shader, props.shading_mode());

        let wireframe = props.wireframe_mode_enabled && tier.supports_polygon_mode();
        if wireframe {
            api.polygon_mode(PolygonMode::Line);
        }
        api.draw_elements(model.index_count());
        if wireframe {
            api.polygon_mode(PolygonMode::Fill);
        }

        api.bind_vertex_array(None);
    }

    /// Draw the skybox behind everything drawn so far.
    pub fn draw_skybox(self, skybox: &Skybox<A>, camera: &Camera) {
        let Renderer {
            api,
            skybox_shader,
            projection,
            ..
        } = &mut *self.renderer;

        // The cube is drawn at depth 1.0, which only passes with LessEqual.
        api.depth_func(DepthFunc::LessEqual);
        skybox_shader.use_program();
        api.bind_vertex_array(Some(skybox.vertex_array()));
        api.active_texture(SKYBOX_TEXTURE_UNIT);
        api.bind_texture(TextureTarget::CubeMap, Some(skybox.texture()));

        let projection_view = *projection * skybox_view(&camera.view_matrix());
        skybox_shader.set_uniform("u_projectionView", projection_view);
        skybox_shader.set_uniform("u_skyboxTexture", SKYBOX_TEXTURE_UNIT as i32);
        api.draw_elements(skybox.index_count());

        api.bind_texture(TextureTarget::CubeMap, None);
        api.bind_vertex_array(None);
        api.depth_func(DepthFunc::Less);
    }
}

use glam::{Mat4, Vec2, Vec3, Vec4};
use image::RgbaImage;

use crate::config::LightParams;
use crate::error::RenderError;

/// Opaque texture name handed out by [`GraphicsPipeline::gen_textures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
    Lighting,
    Light0,
    Texture2d,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixMode {
    ModelView,
    Projection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    LessEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadeModel {
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
    LinearMipmapNearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
}

/// Sampler state for the currently bound texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Vertex arrays for one indexed triangle draw.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub positions: &'a [Vec3],
    pub normals: &'a [Vec3],
    pub tex_coords: &'a [Vec2],
    pub indices: &'a [u32],
}

/// Fixed-function graphics API the renderer drives.
///
/// Calls mirror the classic matrix-stack pipeline; only texture upload can
/// fail, and only during surface setup.
pub trait GraphicsPipeline {
    fn shade_model(&mut self, model: ShadeModel);
    fn clear_color(&mut self, color: Vec4);
    fn clear_depth(&mut self, depth: f32);
    fn clear(&mut self, color: bool, depth: bool);
    fn set_enabled(&mut self, capability: Capability, enabled: bool);
    fn depth_func(&mut self, func: DepthFunc);
    fn nicest_perspective_hint(&mut self);
    fn cull_face(&mut self, face: Face);
    /// Uploads ambient, diffuse and position for light 0.
    fn light(&mut self, params: &LightParams);
    fn light_model_two_side(&mut self, enabled: bool);
    fn color(&mut self, rgba: Vec4);

    fn matrix_mode(&mut self, mode: MatrixMode);
    fn load_identity(&mut self);
    fn push_matrix(&mut self);
    fn pop_matrix(&mut self);
    fn translate(&mut self, offset: Vec3);
    fn mult_matrix(&mut self, matrix: &Mat4);
    fn perspective(&mut self, fov_y_degrees: f32, aspect: f32, z_near: f32, z_far: f32);
    fn viewport(&mut self, viewport: Viewport);

    fn gen_textures(&mut self, count: usize) -> Vec<TextureHandle>;
    fn delete_textures(&mut self, handles: &[TextureHandle]);
    fn bind_texture(&mut self, handle: TextureHandle);
    fn tex_parameters(&mut self, params: TextureParams);
    fn tex_image(&mut self, level: u32, image: &RgbaImage) -> Result<(), RenderError>;

    fn draw_triangles(&mut self, call: DrawCall<'_>);
}

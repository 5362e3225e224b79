use std::collections::{HashMap, HashSet};

use glam::{Mat4, Vec2, Vec3, Vec4};
use image::RgbaImage;
use log::trace;

use crate::config::LightParams;
use crate::error::RenderError;

use super::pipeline::{
    Capability, DepthFunc, DrawCall, Face, GraphicsPipeline, MatrixMode, ShadeModel,
    TextureHandle, TextureParams, Viewport,
};

/// One call issued against a [`RecordingPipeline`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ShadeModel(ShadeModel),
    ClearColor(Vec4),
    ClearDepth(f32),
    Clear { color: bool, depth: bool },
    SetEnabled(Capability, bool),
    DepthFunc(DepthFunc),
    PerspectiveHint,
    CullFace(Face),
    Light(LightParams),
    LightModelTwoSide(bool),
    Color(Vec4),
    MatrixMode(MatrixMode),
    LoadIdentity,
    PushMatrix,
    PopMatrix,
    Translate(Vec3),
    MultMatrix(Mat4),
    Perspective { fov_y_degrees: f32, aspect: f32, z_near: f32, z_far: f32 },
    Viewport(Viewport),
    GenTextures(Vec<TextureHandle>),
    DeleteTextures(Vec<TextureHandle>),
    BindTexture(TextureHandle),
    TexParameters(TextureParams),
    TexImage { level: u32, width: u32, height: u32 },
    Draw(DrawRecord),
}

/// Pipeline state captured at a draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub modelview: Mat4,
    pub texture: Option<TextureHandle>,
    pub lighting: bool,
    pub cull_face: bool,
    pub two_side: bool,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub tex_coords: Vec<Vec2>,
}

/// Headless [`GraphicsPipeline`] that tracks fixed-function state and keeps
/// a log of every call.
#[derive(Debug)]
pub struct RecordingPipeline {
    commands: Vec<Command>,
    enabled: HashSet<Capability>,
    mode: MatrixMode,
    modelview: Vec<Mat4>,
    projection: Vec<Mat4>,
    viewport: Viewport,
    two_side: bool,
    bound: Option<TextureHandle>,
    next_texture: u32,
    live_textures: HashSet<TextureHandle>,
    params: HashMap<TextureHandle, TextureParams>,
    levels: HashMap<TextureHandle, Vec<(u32, u32, u32)>>,
}

impl Default for RecordingPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPipeline {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            enabled: HashSet::new(),
            mode: MatrixMode::ModelView,
            modelview: vec![Mat4::IDENTITY],
            projection: vec![Mat4::IDENTITY],
            viewport: Viewport::default(),
            two_side: false,
            bound: None,
            next_texture: 1,
            live_textures: HashSet::new(),
            params: HashMap::new(),
            levels: HashMap::new(),
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drains the command log, keeping all tracked state.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(|command| match command {
            Command::Draw(record) => Some(record),
            _ => None,
        })
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.enabled.contains(&capability)
    }

    pub fn two_side(&self) -> bool {
        self.two_side
    }

    pub fn viewport_state(&self) -> Viewport {
        self.viewport
    }

    pub fn modelview_matrix(&self) -> Mat4 {
        self.modelview.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    pub fn live_textures(&self) -> &HashSet<TextureHandle> {
        &self.live_textures
    }

    pub fn texture_params(&self, handle: TextureHandle) -> Option<TextureParams> {
        self.params.get(&handle).copied()
    }

    /// `(level, width, height)` for every image uploaded to `handle`.
    pub fn texture_levels(&self, handle: TextureHandle) -> &[(u32, u32, u32)] {
        self.levels.get(&handle).map(Vec::as_slice).unwrap_or(&[])
    }

    fn stack(&mut self) -> &mut Vec<Mat4> {
        match self.mode {
            MatrixMode::ModelView => &mut self.modelview,
            MatrixMode::Projection => &mut self.projection,
        }
    }

    fn apply(&mut self, matrix: Mat4) {
        if let Some(top) = self.stack().last_mut() {
            *top *= matrix;
        }
    }
}

impl GraphicsPipeline for RecordingPipeline {
    fn shade_model(&mut self, model: ShadeModel) {
        self.commands.push(Command::ShadeModel(model));
    }

    fn clear_color(&mut self, color: Vec4) {
        self.commands.push(Command::ClearColor(color));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.commands.push(Command::ClearDepth(depth));
    }

    fn clear(&mut self, color: bool, depth: bool) {
        self.commands.push(Command::Clear { color, depth });
    }

    fn set_enabled(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.enabled.insert(capability);
        } else {
            self.enabled.remove(&capability);
        }
        self.commands.push(Command::SetEnabled(capability, enabled));
    }

    fn depth_func(&mut self, func: DepthFunc) {
        self.commands.push(Command::DepthFunc(func));
    }

    fn nicest_perspective_hint(&mut self) {
        self.commands.push(Command::PerspectiveHint);
    }

    fn cull_face(&mut self, face: Face) {
        self.commands.push(Command::CullFace(face));
    }

    fn light(&mut self, params: &LightParams) {
        self.commands.push(Command::Light(*params));
    }

    fn light_model_two_side(&mut self, enabled: bool) {
        self.two_side = enabled;
        self.commands.push(Command::LightModelTwoSide(enabled));
    }

    fn color(&mut self, rgba: Vec4) {
        self.commands.push(Command::Color(rgba));
    }

    fn matrix_mode(&mut self, mode: MatrixMode) {
        self.mode = mode;
        self.commands.push(Command::MatrixMode(mode));
    }

    fn load_identity(&mut self) {
        if let Some(top) = self.stack().last_mut() {
            *top = Mat4::IDENTITY;
        }
        self.commands.push(Command::LoadIdentity);
    }

    fn push_matrix(&mut self) {
        let stack = self.stack();
        let top = stack.last().copied().unwrap_or(Mat4::IDENTITY);
        stack.push(top);
        self.commands.push(Command::PushMatrix);
    }

    fn pop_matrix(&mut self) {
        let stack = self.stack();
        // The bottom matrix is never popped, matching GL's stack underflow rule.
        if stack.len() > 1 {
            stack.pop();
        }
        self.commands.push(Command::PopMatrix);
    }

    fn translate(&mut self, offset: Vec3) {
        self.apply(Mat4::from_translation(offset));
        self.commands.push(Command::Translate(offset));
    }

    fn mult_matrix(&mut self, matrix: &Mat4) {
        self.apply(*matrix);
        self.commands.push(Command::MultMatrix(*matrix));
    }

    fn perspective(&mut self, fov_y_degrees: f32, aspect: f32, z_near: f32, z_far: f32) {
        self.apply(Mat4::perspective_rh_gl(
            fov_y_degrees.to_radians(),
            aspect,
            z_near,
            z_far,
        ));
        self.commands.push(Command::Perspective {
            fov_y_degrees,
            aspect,
            z_near,
            z_far,
        });
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.commands.push(Command::Viewport(viewport));
    }

    fn gen_textures(&mut self, count: usize) -> Vec<TextureHandle> {
        let handles: Vec<_> = (0..count)
            .map(|_| {
                let handle = TextureHandle(self.next_texture);
                self.next_texture += 1;
                handle
            })
            .collect();
        self.live_textures.extend(handles.iter().copied());
        self.commands.push(Command::GenTextures(handles.clone()));
        handles
    }

    fn delete_textures(&mut self, handles: &[TextureHandle]) {
        for handle in handles {
            self.live_textures.remove(handle);
            self.params.remove(handle);
            self.levels.remove(handle);
            if self.bound == Some(*handle) {
                self.bound = None;
            }
        }
        self.commands.push(Command::DeleteTextures(handles.to_vec()));
    }

    fn bind_texture(&mut self, handle: TextureHandle) {
        self.bound = Some(handle);
        self.commands.push(Command::BindTexture(handle));
    }

    fn tex_parameters(&mut self, params: TextureParams) {
        if let Some(handle) = self.bound {
            self.params.insert(handle, params);
        }
        self.commands.push(Command::TexParameters(params));
    }

    fn tex_image(&mut self, level: u32, image: &RgbaImage) -> Result<(), RenderError> {
        let handle = self
            .bound
            .filter(|handle| self.live_textures.contains(handle))
            .ok_or_else(|| RenderError::TextureUpload("no live texture is bound".into()))?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::TextureUpload(format!(
                "image for level {level} is empty"
            )));
        }
        self.levels
            .entry(handle)
            .or_default()
            .push((level, width, height));
        self.commands.push(Command::TexImage {
            level,
            width,
            height,
        });
        Ok(())
    }

    fn draw_triangles(&mut self, call: DrawCall<'_>) {
        let record = DrawRecord {
            modelview: self.modelview_matrix(),
            texture: self.bound,
            lighting: self.is_enabled(Capability::Lighting),
            cull_face: self.is_enabled(Capability::CullFace),
            two_side: self.two_side,
            vertex_count: call.positions.len(),
            triangle_count: call.indices.len() / 3,
            tex_coords: call.tex_coords.to_vec(),
        };
        trace!(
            "draw {} triangles with texture {:?}",
            record.triangle_count,
            record.texture
        );
        self.commands.push(Command::Draw(record));
    }
}

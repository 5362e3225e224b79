use std::sync::Arc;
use std::time::Instant;

use glam::{Vec3, Vec4};
use log::{debug, info, trace, warn};

use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::geometry::Mesh;
use crate::reflection::ModelRotation;
use crate::shapes::{ShapeKind, ShapeSet};
use crate::state::{SceneSnapshot, SceneState};
use crate::textures::{BitmapLoader, TextureSet};

use super::pipeline::{
    Capability, DepthFunc, DrawCall, Face, GraphicsPipeline, MatrixMode, ShadeModel, Viewport,
};

const BACKGROUND_WIDTH: f32 = 16.0;
const BACKGROUND_HEIGHT: f32 = 12.0;

/// Surface dimensions after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    /// Clamps the height to at least one pixel so the aspect ratio stays finite.
    pub fn clamped(width: u32, height: u32) -> Self {
        Self {
            width,
            height: height.max(1),
        }
    }

    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Summary of one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub snapshot: SceneSnapshot,
    pub object: ShapeKind,
    pub double_sided: bool,
    /// Model-space eye vector used for the reflection coordinates.
    pub eye: Vec3,
    /// Milliseconds integrated into the scene state, `None` on a first frame.
    pub elapsed_ms: Option<f32>,
}

/// Draws the selected solid in front of the background and advances the
/// shared scene state once per frame.
pub struct FrameRenderer<L> {
    config: RendererConfig,
    scene: Arc<SceneState>,
    loader: L,
    shapes: ShapeSet,
    background: Mesh,
    textures: Option<TextureSet>,
    surface: Option<SurfaceSize>,
    last_frame: Option<Instant>,
    paused: bool,
    frames: u64,
}

impl<L: BitmapLoader> FrameRenderer<L> {
    pub fn new(config: RendererConfig, scene: Arc<SceneState>, loader: L) -> Self {
        Self {
            config,
            scene,
            loader,
            shapes: ShapeSet::new(),
            background: Mesh::plane(BACKGROUND_WIDTH, BACKGROUND_HEIGHT),
            textures: None,
            surface: None,
            last_frame: None,
            paused: false,
            frames: 0,
        }
    }

    pub fn scene(&self) -> &Arc<SceneState> {
        &self.scene
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn textures(&self) -> Option<&TextureSet> {
        self.textures.as_ref()
    }

    pub fn surface(&self) -> Option<SurfaceSize> {
        self.surface
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// One-time pipeline setup for a fresh graphics context. Textures from a
    /// previous context must have been released through
    /// [`FrameRenderer::on_surface_destroyed`]; any still held are forgotten.
    pub fn on_surface_created<G: GraphicsPipeline + ?Sized>(&mut self, gl: &mut G) {
        if self.textures.take().is_some() {
            debug!("forgetting textures of the previous surface");
        }
        self.surface = None;

        gl.shade_model(ShadeModel::Smooth);
        gl.clear_color(Vec4::ZERO);
        gl.clear_depth(1.0);
        gl.set_enabled(Capability::DepthTest, true);
        gl.depth_func(DepthFunc::LessEqual);
        gl.nicest_perspective_hint();
        gl.cull_face(Face::Back);

        gl.set_enabled(Capability::Light0, true);
        gl.light(&self.config.light);
        info!("surface created");
    }

    /// Releases every texture while the context that owns them is still
    /// current. The renderer has no surface afterwards.
    pub fn on_surface_destroyed<G: GraphicsPipeline + ?Sized>(&mut self, gl: &mut G) {
        if let Some(textures) = self.textures.take() {
            textures.release(gl);
        }
        self.surface = None;
        info!("surface destroyed");
    }

    /// Reloads every texture, then resets viewport and projection for the new
    /// size. Texture failures are fatal and leave the renderer with neither
    /// textures nor a surface.
    pub fn on_surface_changed<G: GraphicsPipeline + ?Sized>(
        &mut self,
        gl: &mut G,
        width: u32,
        height: u32,
    ) -> Result<SurfaceSize, RenderError> {
        if let Some(previous) = self.textures.take() {
            previous.release(gl);
        }
        self.surface = None;
        self.textures = Some(TextureSet::load(gl, &self.loader, &self.config.textures)?);

        let size = SurfaceSize::clamped(width, height);
        gl.viewport(Viewport {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        });
        gl.matrix_mode(MatrixMode::Projection);
        gl.load_identity();
        gl.perspective(
            self.config.fov_y_degrees,
            size.aspect(),
            self.config.z_near,
            self.config.z_far,
        );
        self.surface = Some(size);
        info!("surface changed to {}x{}", size.width, size.height);
        Ok(size)
    }

    /// Stops frame delivery: paused frames draw nothing and leave the scene
    /// state untouched. The next frame after [`FrameRenderer::resume`] does
    /// not integrate the time spent paused.
    pub fn pause(&mut self) {
        self.paused = true;
        debug!("render loop paused");
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.last_frame = None;
        debug!("render loop resumed");
    }

    pub fn draw_frame<G: GraphicsPipeline + ?Sized>(
        &mut self,
        gl: &mut G,
    ) -> Option<FrameReport> {
        self.draw_frame_at(gl, Instant::now())
    }

    /// Renders one frame using `now` as the frame timestamp. Returns `None`
    /// without touching the pipeline while paused.
    pub fn draw_frame_at<G: GraphicsPipeline + ?Sized>(
        &mut self,
        gl: &mut G,
        now: Instant,
    ) -> Option<FrameReport> {
        if self.paused {
            trace!("skipping frame while paused");
            return None;
        }
        let snapshot = self.scene.snapshot();

        gl.clear(true, true);
        gl.matrix_mode(MatrixMode::ModelView);
        gl.load_identity();
        gl.color(Vec4::ONE);
        gl.set_enabled(Capability::Lighting, snapshot.lighting);

        self.draw_background(gl, &snapshot);

        let distance = self.camera_distance(&snapshot);
        let rotation = ModelRotation::from_snapshot(&snapshot);
        gl.translate(Vec3::new(0.0, 0.0, -distance));
        gl.mult_matrix(&rotation.matrix);
        let eye = rotation.eye_in_model_space(distance);

        let object = snapshot.object;
        let double_sided = object.double_sided();
        if double_sided {
            gl.set_enabled(Capability::CullFace, false);
            gl.light_model_two_side(snapshot.lighting);
        } else {
            gl.set_enabled(Capability::CullFace, true);
            gl.light_model_two_side(false);
        }

        if let Some(textures) = &self.textures {
            gl.bind_texture(textures.sphere_map(snapshot.filter));
        }
        let mesh = self.shapes.mesh_mut(object);
        mesh.compute_reflection_coords(eye, &rotation.matrix);
        gl.draw_triangles(DrawCall {
            positions: mesh.positions(),
            normals: mesh.normals(),
            tex_coords: mesh.reflection_coords(),
            indices: mesh.indices(),
        });

        let elapsed_ms = self.last_frame.map(|last| {
            let elapsed = now.saturating_duration_since(last).as_secs_f32() * 1000.0;
            self.scene.integrate(elapsed);
            elapsed
        });
        self.last_frame = Some(now);
        self.frames += 1;
        trace!("frame {} drew {object} (elapsed {elapsed_ms:?})", self.frames);

        Some(FrameReport {
            snapshot,
            object,
            double_sided,
            eye,
            elapsed_ms,
        })
    }

    fn draw_background<G: GraphicsPipeline + ?Sized>(&self, gl: &mut G, snapshot: &SceneSnapshot) {
        gl.push_matrix();
        gl.translate(Vec3::new(0.0, 0.0, -self.config.background_depth));
        match &self.textures {
            Some(textures) => gl.bind_texture(textures.background(snapshot.filter)),
            None if self.frames == 0 => warn!("drawing before textures were loaded"),
            None => {}
        }
        gl.draw_triangles(DrawCall {
            positions: self.background.positions(),
            normals: self.background.normals(),
            tex_coords: self.background.tex_coords(),
            indices: self.background.indices(),
        });
        gl.pop_matrix();
    }

    /// Eye-to-object distance; zooming never moves the object in front of the
    /// near plane.
    fn camera_distance(&self, snapshot: &SceneSnapshot) -> f32 {
        (self.config.camera_distance - snapshot.zoom).max(self.config.z_near)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::render::RecordingPipeline;
    use crate::textures::MemoryBitmaps;

    fn renderer() -> FrameRenderer<MemoryBitmaps> {
        let config = RendererConfig::default();
        let bitmaps = MemoryBitmaps::procedural(&config.textures, 16);
        FrameRenderer::new(config, Arc::new(SceneState::new()), bitmaps)
    }

    #[test]
    fn clamped_surface_has_finite_aspect() {
        let size = SurfaceSize::clamped(800, 0);
        assert_eq!(size.height, 1);
        assert_eq!(size.aspect(), 800.0);
    }

    #[test]
    fn zoom_moves_camera_but_not_past_near_plane() {
        let renderer = renderer();
        let mut snapshot = SceneSnapshot::default();
        assert_eq!(renderer.camera_distance(&snapshot), 6.0);
        snapshot.zoom = -2.0;
        assert_eq!(renderer.camera_distance(&snapshot), 8.0);
        snapshot.zoom = 50.0;
        assert_eq!(renderer.camera_distance(&snapshot), 1.0);
    }

    #[test]
    fn resume_discards_the_previous_timestamp() {
        let mut renderer = renderer();
        let mut gl = RecordingPipeline::new();
        let start = Instant::now();
        renderer.draw_frame_at(&mut gl, start);
        renderer.pause();
        renderer.resume();
        let report = renderer
            .draw_frame_at(&mut gl, start + Duration::from_secs(5))
            .unwrap();
        assert_eq!(report.elapsed_ms, None);
    }

    #[test]
    fn paused_frames_neither_draw_nor_integrate() {
        let mut renderer = renderer();
        let mut gl = RecordingPipeline::new();
        renderer.scene().set_speed(0.1, 0.0);
        let start = Instant::now();
        renderer.draw_frame_at(&mut gl, start);
        gl.take_commands();

        renderer.pause();
        assert!(renderer.is_paused());
        let skipped = renderer.draw_frame_at(&mut gl, start + Duration::from_millis(100));
        assert!(skipped.is_none());
        assert!(gl.commands().is_empty());
        assert_eq!(renderer.frames_rendered(), 1);
        assert_eq!(renderer.scene().snapshot().dx, 0.0);

        renderer.resume();
        let resumed = renderer
            .draw_frame_at(&mut gl, start + Duration::from_millis(200))
            .unwrap();
        assert_eq!(resumed.elapsed_ms, None);
        assert_eq!(renderer.scene().snapshot().dx, 0.0);
        assert_eq!(renderer.frames_rendered(), 2);
    }
}

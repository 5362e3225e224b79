use std::cell::Cell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec2, Vec3};
use image::RgbaImage;
use sphere_reflect::render::pipeline::{Capability, MatrixMode, Viewport};
use sphere_reflect::render::{Command, DrawRecord};
use sphere_reflect::{
    BitmapLoader, FrameRenderer, MemoryBitmaps, ModelRotation, RecordingPipeline, RenderError,
    RendererConfig, SceneState, ShapeKind, TextureFilter,
};

fn setup() -> (FrameRenderer<MemoryBitmaps>, RecordingPipeline, Arc<SceneState>) {
    let config = RendererConfig::default();
    let bitmaps = MemoryBitmaps::procedural(&config.textures, 16);
    let scene = Arc::new(SceneState::new());
    let mut renderer = FrameRenderer::new(config, Arc::clone(&scene), bitmaps);
    let mut gl = RecordingPipeline::new();
    renderer.on_surface_created(&mut gl);
    renderer.on_surface_changed(&mut gl, 640, 480).unwrap();
    gl.take_commands();
    (renderer, gl, scene)
}

fn draws(gl: &RecordingPipeline) -> Vec<DrawRecord> {
    gl.draws().cloned().collect()
}

#[test]
fn surface_created_configures_depth_cull_and_light() {
    let config = RendererConfig::default();
    let bitmaps = MemoryBitmaps::procedural(&config.textures, 16);
    let mut renderer = FrameRenderer::new(config.clone(), Arc::new(SceneState::new()), bitmaps);
    let mut gl = RecordingPipeline::new();
    renderer.on_surface_created(&mut gl);

    assert!(gl.is_enabled(Capability::DepthTest));
    assert!(gl.is_enabled(Capability::Light0));
    assert!(!gl.is_enabled(Capability::Lighting));
    assert!(gl.commands().contains(&Command::Light(config.light)));
}

#[test]
fn surface_changed_clamps_zero_height() {
    let (mut renderer, mut gl, _) = setup();
    let size = renderer.on_surface_changed(&mut gl, 800, 0).unwrap();
    assert_eq!((size.width, size.height), (800, 1));
    assert_eq!(
        gl.viewport_state(),
        Viewport {
            x: 0,
            y: 0,
            width: 800,
            height: 1
        }
    );
    assert!(gl.commands().iter().any(|command| matches!(
        command,
        Command::Perspective { aspect, fov_y_degrees, z_near, z_far }
            if *aspect == 800.0 && *fov_y_degrees == 45.0 && *z_near == 1.0 && *z_far == 100.0
    )));
    assert!(gl.projection_matrix().is_finite());
}

#[test]
fn surface_changed_releases_and_regenerates_textures() {
    let (mut renderer, mut gl, _) = setup();
    let old = renderer.textures().unwrap().handles().to_vec();
    renderer.on_surface_changed(&mut gl, 320, 240).unwrap();
    let new = renderer.textures().unwrap().handles().to_vec();

    assert_eq!(gl.live_textures().len(), 6);
    assert!(old.iter().all(|handle| !gl.live_textures().contains(handle)));
    assert!(new.iter().all(|handle| gl.live_textures().contains(handle)));
    assert!(gl.commands().contains(&Command::DeleteTextures(old)));
}

#[test]
fn missing_bitmap_fails_surface_setup() {
    let config = RendererConfig::default();
    let mut renderer =
        FrameRenderer::new(config, Arc::new(SceneState::new()), MemoryBitmaps::new());
    let mut gl = RecordingPipeline::new();
    renderer.on_surface_created(&mut gl);
    let err = renderer.on_surface_changed(&mut gl, 640, 480).unwrap_err();
    assert!(matches!(err, RenderError::MissingBitmap(_)));
    assert!(renderer.textures().is_none());
    assert!(renderer.surface().is_none());
}

/// Serves bitmaps until `budget` loads have happened, then reports them missing.
struct LimitedBitmaps {
    bitmaps: MemoryBitmaps,
    budget: Cell<usize>,
}

impl BitmapLoader for LimitedBitmaps {
    fn load(&self, resource: &str) -> Result<RgbaImage, RenderError> {
        match self.budget.get() {
            0 => Err(RenderError::MissingBitmap(resource.to_string())),
            left => {
                self.budget.set(left - 1);
                self.bitmaps.load(resource)
            }
        }
    }
}

#[test]
fn failed_reload_after_successful_setup_drops_the_surface() {
    let config = RendererConfig::default();
    let loader = LimitedBitmaps {
        bitmaps: MemoryBitmaps::procedural(&config.textures, 16),
        budget: Cell::new(2),
    };
    let mut renderer = FrameRenderer::new(config, Arc::new(SceneState::new()), loader);
    let mut gl = RecordingPipeline::new();
    renderer.on_surface_created(&mut gl);
    renderer.on_surface_changed(&mut gl, 640, 480).unwrap();
    assert!(renderer.surface().is_some());

    let err = renderer.on_surface_changed(&mut gl, 320, 240).unwrap_err();
    assert!(matches!(err, RenderError::MissingBitmap(_)));
    assert!(renderer.textures().is_none());
    assert!(renderer.surface().is_none());
    assert!(gl.live_textures().is_empty());
}

#[test]
fn recreating_the_surface_keeps_one_texture_set_alive() {
    let (mut renderer, mut gl, _) = setup();
    for _ in 0..3 {
        renderer.on_surface_destroyed(&mut gl);
        assert!(gl.live_textures().is_empty());
        assert!(renderer.surface().is_none());
        renderer.on_surface_created(&mut gl);
        renderer.on_surface_changed(&mut gl, 640, 480).unwrap();
        assert_eq!(gl.live_textures().len(), 6);
    }
    let handles = renderer.textures().unwrap().handles().to_vec();
    assert!(handles.iter().all(|handle| gl.live_textures().contains(handle)));
}

#[test]
fn frame_issues_calls_in_pipeline_order() {
    let (mut renderer, mut gl, _) = setup();
    renderer.draw_frame(&mut gl);
    let commands = gl.commands();

    let position = |wanted: &dyn Fn(&Command) -> bool| {
        commands
            .iter()
            .position(|command| wanted(command))
            .expect("command was issued")
    };
    let clear = position(&|c: &Command| matches!(c, Command::Clear { color: true, depth: true }));
    let identity = position(&|c: &Command| matches!(c, Command::LoadIdentity));
    let lighting = position(&|c: &Command| matches!(c, Command::SetEnabled(Capability::Lighting, _)));
    let push = position(&|c: &Command| matches!(c, Command::PushMatrix));
    let pop = position(&|c: &Command| matches!(c, Command::PopMatrix));
    let rotate = position(&|c: &Command| matches!(c, Command::MultMatrix(_)));
    let cull = position(&|c: &Command| matches!(c, Command::SetEnabled(Capability::CullFace, _)));
    let two_side = position(&|c: &Command| matches!(c, Command::LightModelTwoSide(_)));
    let draws: Vec<_> = commands
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Command::Draw(_)))
        .map(|(i, _)| i)
        .collect();

    assert_eq!(commands.first(), Some(&Command::Clear { color: true, depth: true }));
    assert!(clear < identity && identity < lighting && lighting < push);
    assert_eq!(draws.len(), 2);
    assert!(push < draws[0] && draws[0] < pop);
    assert!(pop < rotate && rotate < cull && cull < two_side && two_side < draws[1]);
    assert!(commands[..identity].contains(&Command::MatrixMode(MatrixMode::ModelView)));
}

#[test]
fn background_sits_at_fixed_depth_with_filter_texture() {
    let (mut renderer, mut gl, scene) = setup();
    scene.set_filter(TextureFilter::Linear);
    renderer.draw_frame(&mut gl);
    let textures = renderer.textures().unwrap().clone();
    let recorded = draws(&gl);
    let background = &recorded[0];

    assert_eq!(
        background.modelview,
        Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0))
    );
    assert_eq!(background.texture, Some(textures.background(TextureFilter::Linear)));
    assert_eq!(background.tex_coords[2], Vec2::ONE);
}

#[test]
fn object_uses_camera_rotation_and_sphere_map() {
    let (mut renderer, mut gl, scene) = setup();
    scene.rotate_by(30.0, -40.0);
    scene.adjust_tilt(10.0);
    scene.set_filter(TextureFilter::Mipmapped);
    let report = renderer.draw_frame(&mut gl).unwrap();
    let textures = renderer.textures().unwrap().clone();
    let recorded = draws(&gl);
    let object = &recorded[1];

    let rotation = ModelRotation::from_angles(30.0, -40.0, 10.0);
    let expected = Mat4::from_translation(Vec3::new(0.0, 0.0, -6.0)) * rotation.matrix;
    assert!(object.modelview.abs_diff_eq(expected, 1e-5));
    assert_eq!(object.texture, Some(textures.sphere_map(TextureFilter::Mipmapped)));
    assert!(report.eye.abs_diff_eq(rotation.eye_in_model_space(6.0), 1e-5));
    assert_eq!(object.vertex_count, 24);
    assert!(object.tex_coords.iter().any(|c| *c != Vec2::ZERO));
}

#[test]
fn cube_enables_culling_without_two_sided_lighting() {
    let (mut renderer, mut gl, scene) = setup();
    scene.set_object_index(0).unwrap();
    scene.toggle_lighting();
    let report = renderer.draw_frame(&mut gl).unwrap();

    assert_eq!(report.object, ShapeKind::Cube);
    assert!(!report.double_sided);
    let recorded = draws(&gl);
    let object = &recorded[1];
    assert!(object.cull_face);
    assert!(!object.two_side);
    assert!(object.lighting);
}

#[test]
fn cylinder_disables_culling_and_follows_lighting_for_two_side() {
    let (mut renderer, mut gl, scene) = setup();
    scene.set_object_index(1).unwrap();

    let report = renderer.draw_frame(&mut gl).unwrap();
    assert!(report.double_sided);
    let unlit = draws(&gl)[1].clone();
    assert!(!unlit.cull_face);
    assert!(!unlit.two_side);

    gl.take_commands();
    scene.toggle_lighting();
    renderer.draw_frame(&mut gl);
    let lit = draws(&gl)[1].clone();
    assert!(!lit.cull_face);
    assert!(lit.two_side);
}

#[test]
fn every_shape_draws_its_own_mesh() {
    let (mut renderer, mut gl, scene) = setup();
    let mut seen = Vec::new();
    for kind in ShapeKind::ALL {
        scene.set_object(kind);
        gl.take_commands();
        let report = renderer.draw_frame(&mut gl).unwrap();
        assert_eq!(report.object, kind);
        assert_eq!(report.double_sided, kind.double_sided());
        seen.push(draws(&gl)[1].vertex_count);
    }
    assert_eq!(seen[0], 24);
    assert_eq!(seen[3], 17 * 9);
}

#[test]
fn first_frame_skips_integration_and_second_uses_measured_delta() {
    let (mut renderer, mut gl, scene) = setup();
    scene.set_speed(0.1, -0.05);
    let start = Instant::now();

    let first = renderer.draw_frame_at(&mut gl, start).unwrap();
    assert_eq!(first.elapsed_ms, None);
    assert_eq!(scene.snapshot().dx, 0.0);
    assert_eq!(scene.snapshot().dx_speed, 0.1);

    let second = renderer.draw_frame_at(&mut gl, start + Duration::from_millis(40)).unwrap();
    let elapsed = second.elapsed_ms.unwrap();
    assert!((elapsed - 40.0).abs() < 1e-3);
    let snap = scene.snapshot();
    assert!((snap.dx - 4.0).abs() < 1e-4);
    assert!((snap.dy + 2.0).abs() < 1e-4);
    assert!(snap.dx_speed < 0.1 && snap.dx_speed > 0.0);
    // The frame used the snapshot taken before integration.
    assert_eq!(second.snapshot.dx, 0.0);
}

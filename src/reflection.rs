//! Per-frame reflection mapping.
//!
//! The model rotation is composed as `R = Rx(tilt) * Ry(dx) * Rx(dy)`: the
//! drag angle `dy` spins the object about its own X axis first, `dx` then
//! turns it about Y and `tilt` finally pitches the result towards the viewer.
//! Sphere-map coordinates are generated for a viewer at infinity along the
//! eye direction, so only the direction of the eye vector matters.

use glam::{Mat4, Vec2, Vec3};

use crate::state::SceneSnapshot;

/// The eye sits at the near plane in world space.
pub const WORLD_EYE: Vec3 = Vec3::new(0.0, 0.0, 1.0);

/// Rotation data derived from one snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRotation {
    pub matrix: Mat4,
    pub inverse: Mat4,
}

impl ModelRotation {
    pub fn from_angles(dx: f32, dy: f32, tilt: f32) -> Self {
        let matrix = Mat4::from_rotation_x(tilt.to_radians())
            * Mat4::from_rotation_y(dx.to_radians())
            * Mat4::from_rotation_x(dy.to_radians());
        Self {
            matrix,
            inverse: matrix.inverse(),
        }
    }

    pub fn from_snapshot(snapshot: &SceneSnapshot) -> Self {
        Self::from_angles(snapshot.dx, snapshot.dy, snapshot.tilt)
    }

    /// Moves the world-space eye into model space: undo the camera
    /// translation, then the model rotation.
    pub fn eye_in_model_space(&self, camera_distance: f32) -> Vec3 {
        let to_model = self.inverse * Mat4::from_translation(Vec3::new(0.0, 0.0, camera_distance));
        to_model.transform_point3(WORLD_EYE)
    }
}

/// Reflects `incident` about the unit `normal`.
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * incident.dot(normal) * normal
}

/// Sphere-map texture coordinate for one vertex.
///
/// `eye_dir` is the unit model-space direction towards the viewer. The view
/// ray is reflected about the model-space normal, rotated into eye space and
/// its XY components are mapped through `0.5 * r + 0.5`.
pub fn sphere_map_coord(normal: Vec3, eye_dir: Vec3, rotation: &Mat4) -> Vec2 {
    let reflected = reflect(-eye_dir, normal);
    let r = rotation.transform_vector3(reflected).normalize_or_zero();
    Vec2::new(r.x * 0.5 + 0.5, r.y * 0.5 + 0.5).clamp(Vec2::ZERO, Vec2::ONE)
}

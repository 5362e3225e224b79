use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::shapes::ShapeKind;
use crate::textures::TextureFilter;

/// Speeds below this magnitude (degrees per millisecond) snap to zero.
pub const SPEED_EPSILON: f32 = 1e-4;

/// Point-in-time copy of the scene state used for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Accumulated yaw, degrees.
    pub dx: f32,
    /// Accumulated roll about the model X axis, degrees.
    pub dy: f32,
    /// Degrees per millisecond.
    pub dx_speed: f32,
    pub dy_speed: f32,
    pub zoom: f32,
    pub tilt: f32,
    pub object: ShapeKind,
    pub filter: TextureFilter,
    pub lighting: bool,
}

/// Scene state shared between the input thread and the render thread.
///
/// All reads and writes go through one lock, so a snapshot never observes a
/// half-applied mutation.
#[derive(Debug)]
pub struct SceneState {
    inner: Mutex<SceneSnapshot>,
    damping_per_ms: f32,
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneState {
    pub const DEFAULT_DAMPING_PER_MS: f32 = 0.0015;

    pub fn new() -> Self {
        Self::with_damping(Self::DEFAULT_DAMPING_PER_MS)
    }

    pub fn with_damping(damping_per_ms: f32) -> Self {
        Self::from_snapshot(SceneSnapshot::default(), damping_per_ms)
    }

    pub fn from_snapshot(initial: SceneSnapshot, damping_per_ms: f32) -> Self {
        Self {
            inner: Mutex::new(initial),
            damping_per_ms: damping_per_ms.max(0.0),
        }
    }

    /// Copies every field under the lock.
    pub fn snapshot(&self) -> SceneSnapshot {
        *self.inner.lock()
    }

    /// Advances the rotation by `speed * elapsed_ms`, then applies friction.
    ///
    /// Speeds decay by `exp(-damping * elapsed_ms)`, which never changes their
    /// sign; magnitudes below [`SPEED_EPSILON`] become exactly zero.
    pub fn integrate(&self, elapsed_ms: f32) {
        let elapsed = elapsed_ms.max(0.0);
        if elapsed == 0.0 {
            return;
        }
        let factor = (-self.damping_per_ms * elapsed).exp();
        let mut state = self.inner.lock();
        state.dx += state.dx_speed * elapsed;
        state.dy += state.dy_speed * elapsed;
        state.dx_speed = damp(state.dx_speed, factor);
        state.dy_speed = damp(state.dy_speed, factor);
    }

    pub fn toggle_lighting(&self) {
        let mut state = self.inner.lock();
        state.lighting = !state.lighting;
        debug!("lighting {}", if state.lighting { "on" } else { "off" });
    }

    /// Selects the solid by its numeric index; out-of-range indices leave the
    /// state untouched.
    pub fn set_object_index(&self, index: i32) -> Result<(), SceneError> {
        let kind = ShapeKind::try_from(index)?;
        self.set_object(kind);
        Ok(())
    }

    pub fn set_object(&self, kind: ShapeKind) {
        self.inner.lock().object = kind;
    }

    pub fn next_object(&self) {
        let mut state = self.inner.lock();
        state.object = state.object.next();
    }

    pub fn set_filter_index(&self, index: i32) -> Result<(), SceneError> {
        let filter = TextureFilter::try_from(index)?;
        self.set_filter(filter);
        Ok(())
    }

    pub fn set_filter(&self, filter: TextureFilter) {
        self.inner.lock().filter = filter;
    }

    pub fn cycle_filter(&self) {
        let mut state = self.inner.lock();
        state.filter = state.filter.next();
    }

    pub fn adjust_zoom(&self, delta: f32) {
        self.inner.lock().zoom += delta;
    }

    pub fn adjust_tilt(&self, delta: f32) {
        self.inner.lock().tilt += delta;
    }

    /// Applies a drag: both angles change in one critical section.
    pub fn rotate_by(&self, ddx: f32, ddy: f32) {
        let mut state = self.inner.lock();
        state.dx += ddx;
        state.dy += ddy;
    }

    /// Starts a fling with the given angular speeds (degrees per millisecond).
    pub fn set_speed(&self, dx_speed: f32, dy_speed: f32) {
        let mut state = self.inner.lock();
        state.dx_speed = dx_speed;
        state.dy_speed = dy_speed;
    }
}

fn damp(speed: f32, factor: f32) -> f32 {
    let damped = speed * factor;
    if damped.abs() < SPEED_EPSILON {
        0.0
    } else {
        damped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spinning(dx_speed: f32, dy_speed: f32) -> SceneState {
        let state = SceneState::new();
        state.set_speed(dx_speed, dy_speed);
        state
    }

    #[test]
    fn integrate_zero_is_a_no_op() {
        let state = spinning(0.2, -0.1);
        state.rotate_by(10.0, 20.0);
        let before = state.snapshot();
        state.integrate(0.0);
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn integrate_advances_angles_by_speed() {
        let state = spinning(0.5, -0.25);
        state.integrate(16.0);
        let snap = state.snapshot();
        assert!((snap.dx - 8.0).abs() < 1e-5);
        assert!((snap.dy + 4.0).abs() < 1e-5);
    }

    #[test]
    fn damping_shrinks_speed_monotonically_without_flipping_sign() {
        let state = spinning(0.9, -0.7);
        let mut previous = state.snapshot();
        for elapsed in [1.0, 16.0, 33.0, 250.0, 1000.0, 60_000.0] {
            state.integrate(elapsed);
            let snap = state.snapshot();
            assert!(snap.dx_speed.abs() <= previous.dx_speed.abs());
            assert!(snap.dy_speed.abs() <= previous.dy_speed.abs());
            assert!(snap.dx_speed >= 0.0);
            assert!(snap.dy_speed <= 0.0);
            previous = snap;
        }
        assert_eq!(previous.dx_speed, 0.0);
        assert_eq!(previous.dy_speed, 0.0);
    }

    #[test]
    fn longer_elapsed_time_damps_more() {
        let short = spinning(1.0, 1.0);
        let long = spinning(1.0, 1.0);
        short.integrate(10.0);
        long.integrate(100.0);
        assert!(long.snapshot().dx_speed < short.snapshot().dx_speed);
    }

    #[test]
    fn negative_elapsed_time_is_ignored() {
        let state = spinning(1.0, 1.0);
        state.integrate(-50.0);
        assert_eq!(state.snapshot().dx, 0.0);
        assert_eq!(state.snapshot().dx_speed, 1.0);
    }

    #[test]
    fn invalid_object_index_keeps_selection() {
        let state = SceneState::new();
        state.set_object_index(3).unwrap();
        assert_eq!(
            state.set_object_index(9),
            Err(SceneError::InvalidObjectIndex(9))
        );
        assert_eq!(state.snapshot().object, ShapeKind::Sphere);
    }

    #[test]
    fn mutators_are_visible_in_next_snapshot() {
        let state = SceneState::new();
        state.toggle_lighting();
        state.adjust_zoom(-2.0);
        state.adjust_tilt(5.0);
        state.set_filter_index(1).unwrap();
        state.next_object();
        let snap = state.snapshot();
        assert!(snap.lighting);
        assert_eq!(snap.zoom, -2.0);
        assert_eq!(snap.tilt, 5.0);
        assert_eq!(snap.filter, TextureFilter::Linear);
        assert_eq!(snap.object, ShapeKind::Cylinder);
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let state = SceneState::new();
        let first = state.snapshot();
        state.rotate_by(45.0, 45.0);
        assert_eq!(first.dx, 0.0);
        assert_eq!(state.snapshot().dx, 45.0);
    }
}

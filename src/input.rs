use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::RendererConfig;
use crate::state::SceneState;

/// Identifier for a key the demo reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return None;
        };
        if ch.is_ascii_alphabetic() {
            return Some(Self::Character(ch.to_ascii_uppercase()));
        }
        ch.to_digit(10).map(|digit| Self::Digit(digit as u8))
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Up" | "DpadUp" => Up,
        "Down" | "DpadDown" => Down,
        "Left" | "DpadLeft" => Left,
        "Right" | "DpadRight" => Right,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Up,
    Down,
    Left,
    Right,
}

/// Discrete event delivered by the input thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(KeyCode),
    /// Finger movement in pixels since the previous drag event.
    Drag { dx: f32, dy: f32 },
    /// Release velocity in pixels per second.
    Fling { vx: f32, vy: f32 },
    DoubleTap,
}

/// What the host has to do after an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    SceneUpdated,
    /// The display surface must be torn down and recreated.
    RecreateSurface { fullscreen: bool },
    Ignored,
}

/// Translates input events into scene-state mutations.
///
/// Every event results in at most one mutator call; nothing here talks to the
/// graphics pipeline.
#[derive(Debug)]
pub struct InputController {
    scene: Arc<SceneState>,
    zoom_step: f32,
    tilt_step: f32,
    degrees_per_pixel: f32,
    fullscreen: bool,
}

impl InputController {
    pub fn new(scene: Arc<SceneState>, config: &RendererConfig) -> Self {
        Self {
            scene,
            zoom_step: config.zoom_step,
            tilt_step: config.tilt_step,
            degrees_per_pixel: config.drag_degrees_per_pixel,
            fullscreen: false,
        }
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn handle(&mut self, event: InputEvent) -> InputAction {
        match event {
            InputEvent::KeyDown(key) => self.handle_key(key),
            InputEvent::Drag { dx, dy } => {
                self.scene
                    .rotate_by(dx * self.degrees_per_pixel, dy * self.degrees_per_pixel);
                InputAction::SceneUpdated
            }
            InputEvent::Fling { vx, vy } => {
                // px/s -> degrees/ms
                let scale = self.degrees_per_pixel / 1000.0;
                self.scene.set_speed(vx * scale, vy * scale);
                InputAction::SceneUpdated
            }
            InputEvent::DoubleTap => {
                self.fullscreen = !self.fullscreen;
                debug!("fullscreen toggled to {}", self.fullscreen);
                InputAction::RecreateSurface {
                    fullscreen: self.fullscreen,
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode) -> InputAction {
        match key {
            KeyCode::Character('L') => self.scene.toggle_lighting(),
            KeyCode::Character('F') => self.scene.cycle_filter(),
            KeyCode::Character('A') => self.scene.adjust_zoom(-self.zoom_step),
            KeyCode::Character('Z') => self.scene.adjust_zoom(self.zoom_step),
            KeyCode::Named(NamedKey::Up) => self.scene.adjust_tilt(-self.tilt_step),
            KeyCode::Named(NamedKey::Down) => self.scene.adjust_tilt(self.tilt_step),
            KeyCode::Named(NamedKey::Space) => self.scene.next_object(),
            KeyCode::Digit(digit) => {
                if let Err(err) = self.scene.set_object_index(i32::from(digit) - 1) {
                    warn!("ignoring key {digit}: {err}");
                    return InputAction::Ignored;
                }
            }
            _ => return InputAction::Ignored,
        }
        InputAction::SceneUpdated
    }
}

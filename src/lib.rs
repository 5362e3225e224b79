//! Reflective solids rendered through a fixed-function pipeline.
//!
//! The crate holds the engine-independent core of the demo: mesh generators,
//! the scene state shared between the input and render threads, sphere-map
//! reflection math and the per-frame renderer. The graphics API and bitmap
//! decoding sit behind traits so the whole pipeline runs headless in tests.

pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod reflection;
pub mod render;
pub mod shapes;
pub mod state;
pub mod textures;

pub use config::{LightParams, RendererConfig, TextureResources};
pub use error::{ConfigError, RenderError, SceneError};
pub use geometry::Mesh;
pub use input::{InputAction, InputController, InputEvent, KeyCode, NamedKey};
pub use reflection::ModelRotation;
pub use render::{
    FrameRenderer, FrameReport, GraphicsPipeline, RecordingPipeline, SurfaceSize, TextureHandle,
};
pub use shapes::{ShapeKind, ShapeSet};
pub use state::{SceneSnapshot, SceneState};
pub use textures::{BitmapLoader, FileBitmapLoader, MemoryBitmaps, TextureFilter, TextureSet};

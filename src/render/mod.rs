//! Fixed-function rendering: the pipeline abstraction, a recording
//! implementation of it and the per-frame renderer.

mod frame;
pub mod pipeline;
mod recorder;

pub use frame::{FrameReport, FrameRenderer, SurfaceSize};
pub use pipeline::{GraphicsPipeline, TextureHandle};
pub use recorder::{Command, DrawRecord, RecordingPipeline};

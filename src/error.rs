use thiserror::Error;

/// Rejected scene-state mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("object index {0} is out of range (expected 0..=5)")]
    InvalidObjectIndex(i32),
    #[error("texture filter index {0} is out of range (expected 0..=2)")]
    InvalidFilterIndex(i32),
}

/// Fatal error raised while (re)initializing the drawing surface.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("bitmap resource `{0}` is missing")]
    MissingBitmap(String),
    #[error("bitmap resource `{name}` could not be decoded")]
    DecodeBitmap {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("texture upload failed: {0}")]
    TextureUpload(String),
}

/// Failure to read or parse a renderer configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON")]
    Json(#[from] serde_json::Error),
}

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::TextureResources;
use crate::error::{RenderError, SceneError};
use crate::render::pipeline::{
    Capability, FilterMode, GraphicsPipeline, TextureHandle, TextureParams, WrapMode,
};

/// Sampling variant used for both the background and the sphere map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
    Mipmapped,
}

impl TextureFilter {
    pub const ALL: [TextureFilter; 3] = [
        TextureFilter::Nearest,
        TextureFilter::Linear,
        TextureFilter::Mipmapped,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn params(self) -> TextureParams {
        let (mag_filter, min_filter) = match self {
            TextureFilter::Nearest => (FilterMode::Nearest, FilterMode::Nearest),
            TextureFilter::Linear => (FilterMode::Linear, FilterMode::Linear),
            TextureFilter::Mipmapped => (FilterMode::Linear, FilterMode::LinearMipmapNearest),
        };
        TextureParams {
            mag_filter,
            min_filter,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
        }
    }
}

impl TryFrom<i32> for TextureFilter {
    type Error = SceneError;

    fn try_from(index: i32) -> Result<Self, Self::Error> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(SceneError::InvalidFilterIndex(index))
    }
}

impl fmt::Display for TextureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextureFilter::Nearest => "nearest",
            TextureFilter::Linear => "linear",
            TextureFilter::Mipmapped => "mipmapped",
        };
        f.write_str(name)
    }
}

/// Source of decoded bitmaps for texture uploads.
pub trait BitmapLoader {
    fn load(&self, resource: &str) -> Result<RgbaImage, RenderError>;
}

impl<T> BitmapLoader for &T
where
    T: BitmapLoader + ?Sized,
{
    fn load(&self, resource: &str) -> Result<RgbaImage, RenderError> {
        (**self).load(resource)
    }
}

/// Loads bitmaps from image files below a root directory.
#[derive(Debug, Clone)]
pub struct FileBitmapLoader {
    root: PathBuf,
}

impl FileBitmapLoader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl BitmapLoader for FileBitmapLoader {
    fn load(&self, resource: &str) -> Result<RgbaImage, RenderError> {
        let path = self.root.join(resource);
        if !path.is_file() {
            return Err(RenderError::MissingBitmap(path.display().to_string()));
        }
        let image = image::open(&path).map_err(|source| RenderError::DecodeBitmap {
            name: resource.to_string(),
            source,
        })?;
        debug!("decoded {} ({}x{})", path.display(), image.width(), image.height());
        Ok(image.to_rgba8())
    }
}

/// In-memory bitmaps keyed by resource name.
#[derive(Debug, Clone, Default)]
pub struct MemoryBitmaps {
    images: HashMap<String, RgbaImage>,
}

impl MemoryBitmaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// A checkerboard background and a radial-gradient sphere map under the
    /// configured resource names.
    pub fn procedural(resources: &TextureResources, size: u32) -> Self {
        let mut bitmaps = Self::new();
        bitmaps.insert(&resources.background, checkerboard(size, 8));
        bitmaps.insert(&resources.sphere_map, radial_gradient(size));
        bitmaps
    }

    pub fn insert(&mut self, resource: &str, image: RgbaImage) {
        self.images.insert(resource.to_string(), image);
    }
}

impl BitmapLoader for MemoryBitmaps {
    fn load(&self, resource: &str) -> Result<RgbaImage, RenderError> {
        self.images
            .get(resource)
            .cloned()
            .ok_or_else(|| RenderError::MissingBitmap(resource.to_string()))
    }
}

fn checkerboard(size: u32, cells: u32) -> RgbaImage {
    let size = size.max(1);
    let cell = (size / cells.max(1)).max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            Rgba([200, 200, 220, 255])
        } else {
            Rgba([40, 40, 70, 255])
        }
    })
}

fn radial_gradient(size: u32) -> RgbaImage {
    let size = size.max(1);
    let half = size as f32 * 0.5;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = (x as f32 + 0.5 - half) / half;
        let dy = (y as f32 + 0.5 - half) / half;
        let falloff = (1.0 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
        let value = (falloff * 255.0) as u8;
        Rgba([value, value, 255, 255])
    })
}

/// Successive half-size reductions of `base`, ending with a 1x1 level.
/// Level 0 is `base` itself.
pub fn mipmap_chain(base: &RgbaImage) -> Vec<RgbaImage> {
    let mut levels = vec![base.clone()];
    loop {
        let (width, height) = levels[levels.len() - 1].dimensions();
        if width <= 1 && height <= 1 {
            break;
        }
        let next = imageops::resize(
            &levels[levels.len() - 1],
            (width / 2).max(1),
            (height / 2).max(1),
            FilterType::Triangle,
        );
        levels.push(next);
    }
    levels
}

/// Six texture handles: nearest, linear and mipmapped variants of the
/// background followed by the same three variants of the sphere map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSet {
    handles: Vec<TextureHandle>,
}

impl TextureSet {
    const VARIANTS: usize = 3;

    /// Generates, configures and uploads every texture. Any failure aborts
    /// the whole load; handles generated so far are released first.
    pub fn load<G, L>(
        gl: &mut G,
        loader: &L,
        resources: &TextureResources,
    ) -> Result<Self, RenderError>
    where
        G: GraphicsPipeline + ?Sized,
        L: BitmapLoader + ?Sized,
    {
        gl.set_enabled(Capability::Texture2d, true);
        let names = [resources.background.as_str(), resources.sphere_map.as_str()];
        let handles = gl.gen_textures(Self::VARIANTS * names.len());

        for (slot, name) in names.iter().enumerate() {
            let result = loader.load(name).and_then(|bitmap| {
                let group = &handles[slot * Self::VARIANTS..(slot + 1) * Self::VARIANTS];
                upload_variants(gl, group, &bitmap)
            });
            if let Err(err) = result {
                gl.delete_textures(&handles);
                return Err(err);
            }
            info!("loaded texture `{name}`");
        }

        Ok(Self { handles })
    }

    pub fn background(&self, filter: TextureFilter) -> TextureHandle {
        self.handles[filter.index()]
    }

    pub fn sphere_map(&self, filter: TextureFilter) -> TextureHandle {
        self.handles[Self::VARIANTS + filter.index()]
    }

    pub fn handles(&self) -> &[TextureHandle] {
        &self.handles
    }

    pub fn release<G>(self, gl: &mut G)
    where
        G: GraphicsPipeline + ?Sized,
    {
        gl.delete_textures(&self.handles);
    }
}

fn upload_variants<G>(gl: &mut G, group: &[TextureHandle], bitmap: &RgbaImage) -> Result<(), RenderError>
where
    G: GraphicsPipeline + ?Sized,
{
    for (handle, filter) in group.iter().zip(TextureFilter::ALL) {
        gl.bind_texture(*handle);
        gl.tex_parameters(filter.params());
        if filter == TextureFilter::Mipmapped {
            for (level, image) in mipmap_chain(bitmap).iter().enumerate() {
                gl.tex_image(level as u32, image)?;
            }
        } else {
            gl.tex_image(0, bitmap)?;
        }
    }
    Ok(())
}

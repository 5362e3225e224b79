use std::f32::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::geometry::Mesh;

/// The selectable solids, in key/index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    Cube,
    Cylinder,
    Disk,
    Sphere,
    Cone,
    PartialDisk,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 6] = [
        ShapeKind::Cube,
        ShapeKind::Cylinder,
        ShapeKind::Disk,
        ShapeKind::Sphere,
        ShapeKind::Cone,
        ShapeKind::PartialDisk,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Open surfaces show their inside, so they are drawn without culling.
    pub fn double_sided(self) -> bool {
        !matches!(self, ShapeKind::Cube | ShapeKind::Sphere)
    }

    /// The following kind, wrapping back to the cube.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

impl TryFrom<i32> for ShapeKind {
    type Error = SceneError;

    fn try_from(index: i32) -> Result<Self, Self::Error> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(SceneError::InvalidObjectIndex(index))
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Cube => "cube",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Disk => "disk",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cone => "cone",
            ShapeKind::PartialDisk => "partial disk",
        };
        f.write_str(name)
    }
}

/// One mesh per [`ShapeKind`], owned by the renderer for the surface lifetime.
#[derive(Debug, Clone)]
pub struct ShapeSet {
    meshes: [Mesh; 6],
}

impl ShapeSet {
    pub fn new() -> Self {
        Self {
            meshes: ShapeKind::ALL.map(build_mesh),
        }
    }

    pub fn mesh(&self, kind: ShapeKind) -> &Mesh {
        &self.meshes[kind.index()]
    }

    pub fn mesh_mut(&mut self, kind: ShapeKind) -> &mut Mesh {
        &mut self.meshes[kind.index()]
    }
}

impl Default for ShapeSet {
    fn default() -> Self {
        Self::new()
    }
}

fn build_mesh(kind: ShapeKind) -> Mesh {
    match kind {
        ShapeKind::Cube => Mesh::cube(1.0),
        ShapeKind::Cylinder => Mesh::cylinder(1.0, 1.0, 3.0, 16, 4),
        ShapeKind::Disk => Mesh::disk(0.5, 1.5, 16, 4),
        ShapeKind::Sphere => Mesh::sphere(1.3, 16, 8),
        ShapeKind::Cone => Mesh::cylinder(1.0, 0.0, 3.0, 16, 4),
        ShapeKind::PartialDisk => Mesh::partial_disk(0.5, 1.5, 16, 4, PI / 4.0, 7.0 * PI / 4.0),
    }
}

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3};

use crate::reflection;

/// Indexed triangle mesh with normals, base texture coordinates and a
/// per-frame buffer of sphere-map texture coordinates.
///
/// Everything except `reflection_coords` is fixed once the generator returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    reflection_coords: Vec<Vec2>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Axis-aligned cube centered on the origin; `half_extent` is the distance
    /// from the center to each face.
    pub fn cube(half_extent: f32) -> Self {
        // (outward normal, u axis, v axis) with u x v == normal
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        ];
        let mut builder = MeshBuilder::default();
        for (normal, u, v) in FACES {
            let center = normal * half_extent;
            let corners = [
                (-u - v, Vec2::new(0.0, 0.0)),
                (u - v, Vec2::new(1.0, 0.0)),
                (u + v, Vec2::new(1.0, 1.0)),
                (-u + v, Vec2::new(0.0, 1.0)),
            ];
            let base = builder.len();
            for (offset, tex) in corners {
                builder.push(center + offset * half_extent, normal, tex);
            }
            builder.quad(base, base + 1, base + 2, base + 3);
        }
        builder.build()
    }

    /// Open cylinder along Z centered on the origin. A zero `top_radius`
    /// produces a cone.
    pub fn cylinder(
        base_radius: f32,
        top_radius: f32,
        height: f32,
        slices: u32,
        stacks: u32,
    ) -> Self {
        let slices = slices.max(3);
        let stacks = stacks.max(1);
        let slope = if height.abs() > f32::EPSILON {
            (base_radius - top_radius) / height
        } else {
            0.0
        };
        let mut builder = MeshBuilder::default();
        for i in 0..=slices {
            let s = i as f32 / slices as f32;
            let (sin, cos) = (TAU * s).sin_cos();
            let normal = Vec3::new(cos, sin, slope).normalize();
            for j in 0..=stacks {
                let t = j as f32 / stacks as f32;
                let radius = base_radius + (top_radius - base_radius) * t;
                let z = height * (t - 0.5);
                builder.push(
                    Vec3::new(radius * cos, radius * sin, z),
                    normal,
                    Vec2::new(s, t),
                );
            }
        }
        let column = stacks + 1;
        for i in 0..slices {
            for j in 0..stacks {
                let a = i * column + j;
                let b = (i + 1) * column + j;
                builder.quad(a, b, b + 1, a + 1);
            }
        }
        builder.build()
    }

    /// Flat annulus in the XY plane facing +Z.
    pub fn disk(inner_radius: f32, outer_radius: f32, slices: u32, loops: u32) -> Self {
        Self::partial_disk(inner_radius, outer_radius, slices, loops, 0.0, TAU)
    }

    /// Annulus sector starting at `start` radians (from +X, counter-clockwise)
    /// and covering `sweep` radians.
    pub fn partial_disk(
        inner_radius: f32,
        outer_radius: f32,
        slices: u32,
        loops: u32,
        start: f32,
        sweep: f32,
    ) -> Self {
        let slices = slices.max(1);
        let loops = loops.max(1);
        let scale = if outer_radius.abs() > f32::EPSILON {
            0.5 / outer_radius
        } else {
            0.0
        };
        let mut builder = MeshBuilder::default();
        for i in 0..=slices {
            let angle = start + sweep * (i as f32 / slices as f32);
            let (sin, cos) = angle.sin_cos();
            for j in 0..=loops {
                let radius = inner_radius + (outer_radius - inner_radius) * (j as f32 / loops as f32);
                let position = Vec3::new(radius * cos, radius * sin, 0.0);
                let tex = Vec2::new(position.x * scale + 0.5, position.y * scale + 0.5);
                builder.push(position, Vec3::Z, tex);
            }
        }
        let column = loops + 1;
        for i in 0..slices {
            for j in 0..loops {
                let a = i * column + j;
                let d = (i + 1) * column + j;
                builder.quad(a, a + 1, d + 1, d);
            }
        }
        builder.build()
    }

    /// UV sphere centered on the origin with its poles on the Z axis.
    pub fn sphere(radius: f32, slices: u32, stacks: u32) -> Self {
        let slices = slices.max(3);
        let stacks = stacks.max(2);
        let mut builder = MeshBuilder::default();
        for j in 0..=stacks {
            let t = j as f32 / stacks as f32;
            let (sin_phi, cos_phi) = (PI * t).sin_cos();
            for i in 0..=slices {
                let s = i as f32 / slices as f32;
                let (sin_theta, cos_theta) = (TAU * s).sin_cos();
                let normal = Vec3::new(sin_phi * cos_theta, sin_phi * sin_theta, cos_phi);
                builder.push(normal * radius, normal, Vec2::new(s, 1.0 - t));
            }
        }
        let row = slices + 1;
        for j in 0..stacks {
            for i in 0..slices {
                let a = j * row + i;
                let d = (j + 1) * row + i;
                builder.quad(a, d, d + 1, a + 1);
            }
        }
        builder.build()
    }

    /// Single textured rectangle in the XY plane facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let mut builder = MeshBuilder::default();
        builder.push(Vec3::new(-hw, -hh, 0.0), Vec3::Z, Vec2::new(0.0, 0.0));
        builder.push(Vec3::new(hw, -hh, 0.0), Vec3::Z, Vec2::new(1.0, 0.0));
        builder.push(Vec3::new(hw, hh, 0.0), Vec3::Z, Vec2::new(1.0, 1.0));
        builder.push(Vec3::new(-hw, hh, 0.0), Vec3::Z, Vec2::new(0.0, 1.0));
        builder.quad(0, 1, 2, 3);
        builder.build()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn tex_coords(&self) -> &[Vec2] {
        &self.tex_coords
    }

    /// Sphere-map coordinates from the last call to
    /// [`Mesh::compute_reflection_coords`]; zeroed until then.
    pub fn reflection_coords(&self) -> &[Vec2] {
        &self.reflection_coords
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Recomputes the sphere-map coordinates of every vertex for the given
    /// model-space eye vector and model rotation.
    pub fn compute_reflection_coords(&mut self, eye: Vec3, rotation: &Mat4) {
        let eye_dir = eye.normalize_or_zero();
        for (coord, normal) in self.reflection_coords.iter_mut().zip(&self.normals) {
            *coord = reflection::sphere_map_coord(*normal, eye_dir, rotation);
        }
    }
}

#[derive(Default)]
struct MeshBuilder {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    fn len(&self) -> u32 {
        self.positions.len() as u32
    }

    fn push(&mut self, position: Vec3, normal: Vec3, tex: Vec2) {
        self.positions.push(position);
        self.normals.push(normal);
        self.tex_coords.push(tex);
    }

    /// Two counter-clockwise triangles for the quad `a b c d`.
    fn quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.indices.extend_from_slice(&[a, b, c, a, c, d]);
    }

    fn build(self) -> Mesh {
        let reflection_coords = vec![Vec2::ZERO; self.positions.len()];
        Mesh {
            positions: self.positions,
            normals: self.normals,
            tex_coords: self.tex_coords,
            reflection_coords,
            indices: self.indices,
        }
    }
}

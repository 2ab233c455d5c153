//! CPU-side geometry and the built-in procedural mesh provider.

use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::error::InitError;

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2, tangent: Vec3) -> Self {
        Self {
            position: position.into(),
            normal: normal.into(),
            uv: uv.into(),
            tangent: tangent.into(),
        }
    }
}

/// Indexed triangle list. Triangles wind so that the right-hand cross
/// product of their edges points outward, which shows up clockwise on
/// screen under the left-handed projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push_vertex(&mut self, vertex: MeshVertex) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    /// Adds a rectangle centred on `center`, facing `normal`, with texture
    /// u running along `u_axis`.
    fn push_quad(&mut self, center: Vec3, normal: Vec3, u_axis: Vec3, half: Vec2, tiling: f32) {
        let v_axis = normal.cross(u_axis);
        let corners = [
            (Vec2::new(-1.0, -1.0), Vec2::new(0.0, 1.0)),
            (Vec2::new(1.0, -1.0), Vec2::new(1.0, 1.0)),
            (Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0)),
            (Vec2::new(-1.0, 1.0), Vec2::new(0.0, 0.0)),
        ];
        let base = self.vertices.len() as u32;
        for (corner, uv) in corners {
            let position = center + u_axis * corner.x * half.x + v_axis * corner.y * half.y;
            self.push_vertex(MeshVertex::new(position, normal, uv * tiling, u_axis));
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Flips any triangle whose winding disagrees with its vertex normals.
    fn orient_outward(&mut self) {
        for triangle in self.indices.chunks_exact_mut(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| self.vertices[i as usize]);
            let pa = Vec3::from_array(a.position);
            let face = (Vec3::from_array(b.position) - pa).cross(Vec3::from_array(c.position) - pa);
            let normal = Vec3::from_array(a.normal) + Vec3::from_array(b.normal) + Vec3::from_array(c.normal);
            if face.dot(normal) < 0.0 {
                triangle.swap(1, 2);
            }
        }
    }
}

/// Supplies meshes by name. Failures abort scene initialisation.
pub trait MeshProvider {
    fn load(&self, name: &str) -> Result<MeshData, InitError>;
}

/// Generates the demo scene's geometry without touching the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProceduralMeshes;

impl MeshProvider for ProceduralMeshes {
    fn load(&self, name: &str) -> Result<MeshData, InitError> {
        let mesh = match name {
            "ground" => ground(100.0, 8.0),
            "cube" => cuboid(Vec3::splat(-5.0), Vec3::splat(5.0)),
            "crate" => cuboid(Vec3::new(-1.2, 0.0, -3.0), Vec3::new(1.2, 2.6, 3.0)),
            "sphere" => sphere(10.0, 32, 16),
            "teapot" => torus(6.0, 2.5, 40, 20),
            "light" => flare(),
            other => return Err(InitError::mesh(other, "no procedural generator with that name")),
        };
        Ok(mesh)
    }
}

fn ground(half_size: f32, tiling: f32) -> MeshData {
    let mut mesh = MeshData::default();
    mesh.push_quad(Vec3::ZERO, Vec3::Y, Vec3::X, Vec2::splat(half_size), tiling);
    mesh
}

fn cuboid(min: Vec3, max: Vec3) -> MeshData {
    let center = (min + max) * 0.5;
    let half = (max - min) * 0.5;
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec2::new(half.z, half.y), half.x),
        (Vec3::NEG_X, Vec3::Z, Vec2::new(half.z, half.y), half.x),
        (Vec3::Y, Vec3::X, Vec2::new(half.x, half.z), half.y),
        (Vec3::NEG_Y, Vec3::X, Vec2::new(half.x, half.z), half.y),
        (Vec3::Z, Vec3::X, Vec2::new(half.x, half.y), half.z),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec2::new(half.x, half.y), half.z),
    ];
    let mut mesh = MeshData::default();
    for (normal, u_axis, extent, depth) in faces {
        mesh.push_quad(center + normal * depth, normal, u_axis, extent, 1.0);
    }
    mesh.orient_outward();
    mesh
}

/// Builds a `(rows + 1) x (cols + 1)` vertex grid from a surface function
/// of `(u, v)` in [0, 1] returning position, normal and tangent.
fn parametric(
    rows: u32,
    cols: u32,
    tiling: Vec2,
    surface: impl Fn(f32, f32) -> (Vec3, Vec3, Vec3),
) -> MeshData {
    let mut mesh = MeshData::default();
    for row in 0..=rows {
        let v = row as f32 / rows as f32;
        for col in 0..=cols {
            let u = col as f32 / cols as f32;
            let (position, normal, tangent) = surface(u, v);
            mesh.push_vertex(MeshVertex::new(position, normal, Vec2::new(u, v) * tiling, tangent));
        }
    }
    let stride = cols + 1;
    for row in 0..rows {
        for col in 0..cols {
            let a = row * stride + col;
            let b = a + 1;
            let c = a + stride + 1;
            let d = a + stride;
            mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    mesh.orient_outward();
    mesh
}

fn sphere(radius: f32, segments: u32, rings: u32) -> MeshData {
    parametric(rings, segments, Vec2::new(4.0, 2.0), |u, v| {
        let theta = u * TAU;
        let phi = v * PI;
        let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
        let tangent = Vec3::new(-theta.sin(), 0.0, theta.cos());
        (normal * radius, normal, tangent)
    })
}

fn torus(major: f32, minor: f32, segments: u32, sides: u32) -> MeshData {
    parametric(sides, segments, Vec2::new(6.0, 2.0), |u, v| {
        let theta = u * TAU;
        let phi = v * TAU;
        let ring = Vec3::new(theta.cos(), 0.0, theta.sin());
        let normal = ring * phi.cos() + Vec3::Y * phi.sin();
        let position = ring * major + normal * minor + Vec3::Y * minor;
        let tangent = Vec3::new(-theta.sin(), 0.0, theta.cos());
        (position, normal, tangent)
    })
}

/// Two crossed unit quads; drawn without culling so both sides show.
fn flare() -> MeshData {
    let mut mesh = MeshData::default();
    mesh.push_quad(Vec3::ZERO, Vec3::NEG_Z, Vec3::X, Vec2::splat(0.5), 1.0);
    mesh.push_quad(Vec3::ZERO, Vec3::X, Vec3::Z, Vec2::splat(0.5), 1.0);
    mesh
}

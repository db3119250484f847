//! Triangle mesh generation for scene primitives

use glam::Vec3;
use std::f32::consts::{FRAC_PI_2, TAU};

use super::vertex::Vertex;
use crate::scene::MeshKind;

/// Indexed triangle list
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Build the mesh for a scene object shape
pub fn mesh_for(kind: &MeshKind) -> MeshData {
    match *kind {
        MeshKind::Box { size } => cuboid(size),
        MeshKind::Capsule {
            radius,
            length,
            cap_segments,
            radial_segments,
        } => capsule(radius, length, cap_segments, radial_segments),
    }
}

/// Box centered on the origin with flat per-face normals
pub fn cuboid(size: Vec3) -> MeshData {
    let half = size / 2.0;
    // (normal, u, v) with u x v = normal so corners wind counter-clockwise
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut mesh = MeshData {
        vertices: Vec::with_capacity(24),
        indices: Vec::with_capacity(36),
    };

    for (normal, u, v) in faces {
        let base = mesh.vertices.len() as u16;
        for (s, t) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let corner = (normal + u * s + v * t) * half;
            mesh.vertices
                .push(Vertex::new(corner.to_array(), normal.to_array()));
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    mesh
}

/// Y-up capsule: a cylinder of `length` with hemispherical caps of `radius`.
/// Total height is `length + 2 * radius`.
pub fn capsule(radius: f32, length: f32, cap_segments: u32, radial_segments: u32) -> MeshData {
    let cap_segments = cap_segments.max(1);
    let radial_segments = radial_segments.max(3);
    let half_length = length / 2.0;

    // Rings run from the top pole down to the bottom pole. The two equator rings
    // (one per hemisphere) bound the cylinder section.
    let mut rings = Vec::with_capacity(2 * (cap_segments as usize + 1));
    for i in 0..=cap_segments {
        let phi = i as f32 / cap_segments as f32 * FRAC_PI_2;
        rings.push((phi, half_length));
    }
    for i in 0..=cap_segments {
        let phi = FRAC_PI_2 + i as f32 / cap_segments as f32 * FRAC_PI_2;
        rings.push((phi, -half_length));
    }

    let ring_len = radial_segments as usize + 1;
    let mut mesh = MeshData {
        vertices: Vec::with_capacity(rings.len() * ring_len),
        indices: Vec::with_capacity((rings.len() - 1) * radial_segments as usize * 6),
    };

    for &(phi, center_y) in &rings {
        let (sin_phi, cos_phi) = phi.sin_cos();
        for j in 0..=radial_segments {
            let theta = j as f32 / radial_segments as f32 * TAU;
            let (sin_theta, cos_theta) = theta.sin_cos();
            let normal = Vec3::new(sin_phi * cos_theta, cos_phi, sin_phi * sin_theta);
            let position = Vec3::new(0.0, center_y, 0.0) + normal * radius;
            mesh.vertices
                .push(Vertex::new(position.to_array(), normal.to_array()));
        }
    }

    for ring in 0..rings.len() - 1 {
        for j in 0..radial_segments as usize {
            let a = (ring * ring_len + j) as u16;
            let b = a + 1;
            let c = a + ring_len as u16;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, b, d, a, d, c]);
        }
    }

    mesh
}

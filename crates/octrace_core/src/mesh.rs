//! Mesh geometry for building scenes.
//!
//! Meshes are convenience containers: the tracer only sees the flat face list
//! a mesh is expanded into by `Scene::add_mesh`.

use octrace_math::{Aabb, Vec3};

/// A mesh polygon. The tracer handles triangles and (convex) quads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polygon {
    Tri([u32; 3]),
    Quad([u32; 4]),
}

impl Polygon {
    pub fn indices(&self) -> &[u32] {
        match self {
            Polygon::Tri(i) => i,
            Polygon::Quad(i) => i,
        }
    }
}

/// A mesh consisting of vertex positions, optional normals, and polygons.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - will be computed if not provided)
    pub normals: Option<Vec<Vec3>>,

    /// Triangles and quads
    pub polygons: Vec<Polygon>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and polygons.
    ///
    /// Normals are NOT computed automatically; call `compute_normals()`
    /// or `ensure_normals()` when smooth shading needs them.
    pub fn new(positions: Vec<Vec3>, polygons: Vec<Polygon>) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals: None,
            polygons,
            bounds,
        }
    }

    /// A single quad.
    pub fn quad(corners: [Vec3; 4]) -> Self {
        Self::new(corners.to_vec(), vec![Polygon::Quad([0, 1, 2, 3])])
    }

    /// Square in the XZ plane facing +Y, `half_size` from centre to edge.
    pub fn plane(center: Vec3, half_size: f32) -> Self {
        let h = half_size;
        Self::quad([
            center + Vec3::new(-h, 0.0, -h),
            center + Vec3::new(-h, 0.0, h),
            center + Vec3::new(h, 0.0, h),
            center + Vec3::new(h, 0.0, -h),
        ])
    }

    /// Axis-aligned cube with outward facing quads.
    pub fn cube(center: Vec3, half_size: f32) -> Self {
        let h = half_size;
        let positions = (0..8)
            .map(|i| {
                let sign = |bit: u32| if i & bit != 0 { h } else { -h };
                center + Vec3::new(sign(1), sign(2), sign(4))
            })
            .collect();

        let polygons = vec![
            Polygon::Quad([0, 4, 6, 2]), // -x
            Polygon::Quad([1, 3, 7, 5]), // +x
            Polygon::Quad([0, 1, 5, 4]), // -y
            Polygon::Quad([2, 6, 7, 3]), // +y
            Polygon::Quad([0, 2, 3, 1]), // -z
            Polygon::Quad([4, 5, 7, 6]), // +z
        ];
        Self::new(positions, polygons)
    }

    /// UV sphere made of quads with triangle fans at the poles.
    pub fn uv_sphere(center: Vec3, radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut positions = vec![center + Vec3::new(0.0, radius, 0.0)];
        for ring in 1..rings {
            let theta = std::f32::consts::PI * ring as f32 / rings as f32;
            for seg in 0..segments {
                let phi = std::f32::consts::TAU * seg as f32 / segments as f32;
                let dir = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                positions.push(center + dir * radius);
            }
        }
        let south = positions.len() as u32;
        positions.push(center - Vec3::new(0.0, radius, 0.0));

        let ring_start = |ring: u32| 1 + (ring - 1) * segments;
        let mut polygons = Vec::new();
        for seg in 0..segments {
            let next = (seg + 1) % segments;
            polygons.push(Polygon::Tri([0, ring_start(1) + next, ring_start(1) + seg]));
            for ring in 1..rings - 1 {
                let a = ring_start(ring);
                let b = ring_start(ring + 1);
                polygons.push(Polygon::Quad([a + seg, a + next, b + next, b + seg]));
            }
            let last = ring_start(rings - 1);
            polygons.push(Polygon::Tri([south, last + seg, last + next]));
        }

        let mut mesh = Self::new(positions, polygons);
        mesh.normals = Some(
            mesh.positions
                .iter()
                .map(|p| (*p - center).normalize_or_zero())
                .collect(),
        );
        mesh
    }

    /// Compute axis-aligned bounding box from positions.
    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        positions
            .iter()
            .fold(Aabb::EMPTY, |bounds, pos| bounds.include(*pos))
    }

    /// Compute smooth vertex normals by averaging polygon normals.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for polygon in &self.polygons {
            let indices = polygon.indices();
            if indices.iter().any(|&i| i as usize >= vertex_count) {
                continue;
            }
            let corners: Vec<Vec3> = indices.iter().map(|&i| self.positions[i as usize]).collect();
            let normal = polygon_normal(&corners);
            for &i in indices {
                normals[i as usize] += normal;
            }
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Ensure the mesh has one normal per vertex, computing them if necessary.
    pub fn ensure_normals(&mut self) {
        let count = self.normals.as_ref().map(Vec::len);
        if count != Some(self.positions.len()) {
            if let Some(count) = count {
                log::debug!(
                    "Normals array length ({}) doesn't match vertex count ({}), computing smooth normals",
                    count,
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    /// Get the mesh center (center of bounding box).
    pub fn center(&self) -> Vec3 {
        self.bounds.centroid()
    }

    /// Get the number of polygons in the mesh.
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Unit normal of a triangle or quad, counter-clockwise winding.
///
/// Quads use the cross product of their diagonals. Degenerate polygons
/// yield `Vec3::ZERO`.
pub fn polygon_normal(corners: &[Vec3]) -> Vec3 {
    let n = match corners {
        [a, b, c] => (*b - *a).cross(*c - *a),
        [a, b, c, d] => (*c - *a).cross(*d - *b),
        _ => Vec3::ZERO,
    };
    n.normalize_or_zero()
}

//! Segment-face intersection.
//!
//! Faces are intersected as one or two triangles that share the face's last
//! vertex `v3`: a triangle is (v1, v2, v3); a quad adds (v4, v2, v3) where
//! `v4` is its third corner. The determinant formulation reports the hit as
//!
//! ```text
//! hit = start + labda * vec = -u * vA - v * vB + (1 + u + v) * v3
//! ```
//!
//! with `-1 < u < 0`, `v < 0`, `u + v > -1` inside the triangle and
//! `0 < labda < 1` inside the segment.

use glam::Vec3;
use octrace_core::{Face, Scene};

/// Which triangle of a quad was hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QuadHalf {
    /// (v1, v2, v3), also used for triangles
    #[default]
    First,
    /// (v4, v2, v3)
    Second,
}

/// Face corners in intersection order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceVerts {
    pub v1: Vec3,
    pub v2: Vec3,
    /// Corner shared by both triangles (the face's last vertex)
    pub v3: Vec3,
    /// Third corner of a quad
    pub v4: Option<Vec3>,
}

impl FaceVerts {
    pub fn of(scene: &Scene, face: &Face) -> Self {
        match face.v4 {
            Some(last) => Self {
                v1: scene.vertex(face.v[0]),
                v2: scene.vertex(face.v[1]),
                v3: scene.vertex(last),
                v4: Some(scene.vertex(face.v[2])),
            },
            None => Self {
                v1: scene.vertex(face.v[0]),
                v2: scene.vertex(face.v[1]),
                v3: scene.vertex(face.v[2]),
                v4: None,
            },
        }
    }

    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            v1: a,
            v2: b,
            v3: c,
            v4: None,
        }
    }

    /// Quad from corners in winding order.
    pub fn quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Self {
        Self {
            v1: a,
            v2: b,
            v3: d,
            v4: Some(c),
        }
    }
}

/// A segment-face hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceHit {
    pub labda: f32,
    pub u: f32,
    pub v: f32,
    pub half: QuadHalf,
}

impl FaceHit {
    /// Interpolation weights for the corners given by `barycentric_corners`.
    pub fn weights(&self) -> [f32; 3] {
        [-self.u, -self.v, 1.0 + self.u + self.v]
    }
}

/// Face vertex slots (indices into the face's winding order) that the
/// weights of a hit apply to.
pub fn barycentric_corners(half: QuadHalf, is_quad: bool) -> [usize; 3] {
    match (is_quad, half) {
        (true, QuadHalf::Second) => [2, 1, 3],
        (true, QuadHalf::First) => [0, 1, 3],
        (false, _) => [0, 1, 2],
    }
}

/// Intersect the segment `start..start + vec` with a face.
pub fn intersect_face(start: Vec3, vec: Vec3, face: &FaceVerts) -> Option<FaceHit> {
    let t1 = face.v3 - face.v2;
    let x = vec.cross(t1);
    let m = start - face.v3;
    let det1 = m.dot(x);

    let t0 = face.v3 - face.v1;
    if let Some(hit) = triangle_hit(t0, t1, x, m, det1, vec, QuadHalf::First) {
        return Some(hit);
    }

    let v4 = face.v4?;
    let t2 = face.v3 - v4;
    triangle_hit(t2, t1, x, m, det1, vec, QuadHalf::Second)
}

/// One triangle of the determinant test; `t` is the edge to the free corner.
#[inline]
fn triangle_hit(
    t: Vec3,
    t1: Vec3,
    x: Vec3,
    m: Vec3,
    det1: f32,
    r: Vec3,
    half: QuadHalf,
) -> Option<FaceHit> {
    let divdet = t.dot(x);
    if divdet == 0.0 {
        return None;
    }
    let divdet = 1.0 / divdet;
    let u = det1 * divdet;
    if !(u < 0.0 && u > -1.0) {
        return None;
    }

    let cros = m.cross(t);
    let v = divdet * cros.dot(r);
    if !(v < 0.0 && u + v > -1.0) {
        return None;
    }

    let labda = divdet * cros.dot(t1);
    (labda > 0.0 && labda < 1.0).then_some(FaceHit { labda, u, v, half })
}

/// True when the line through `start` along `-vec` crosses the face.
///
/// Used to decide whether a very close hit on a neighbour of the origin face
/// is real: it is when the segment really starts on the origin face. Bounds
/// are inclusive and the segment length is ignored.
pub fn line_crosses_face(start: Vec3, vec: Vec3, face: &FaceVerts) -> bool {
    let r = -vec;
    let t1 = face.v3 - face.v2;
    let x = t1.cross(r);
    let m = start - face.v3;
    let det1 = m.dot(x);
    let mr = m.cross(r);

    let inside = |t: Vec3| {
        let divdet = t.dot(x);
        if divdet == 0.0 {
            return false;
        }
        let u = det1 / divdet;
        if u > 0.0 {
            return false;
        }
        let v = t.dot(mr) / divdet;
        v <= 0.0 && u + v >= -1.0
    };

    inside(face.v3 - face.v1) || face.v4.is_some_and(|v4| inside(face.v3 - v4))
}

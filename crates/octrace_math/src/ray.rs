use crate::Vec3;

/// A ray in 3D space with origin and direction.
///
/// Camera rays are unbounded; the octree traces finite segments, so
/// `segment_end` turns a ray into the far endpoint of such a segment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Endpoint of a segment of the given length along the normalized direction.
    pub fn segment_end(&self, length: f32) -> Vec3 {
        self.origin + self.direction.normalize_or_zero() * length
    }
}

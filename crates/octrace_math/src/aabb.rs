use crate::{Interval, Vec3};

/// Axis-Aligned Bounding Box, the outer bound of the octree grid.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        }
    }

    /// Grow the box to contain a point.
    pub fn include(&self, p: Vec3) -> Aabb {
        Aabb {
            x: self.x.include(p.x),
            y: self.y.include(p.y),
            z: self.z.include(p.z),
        }
    }

    /// Expand every side by `margin`.
    pub fn pad(&self, margin: f32) -> Aabb {
        Aabb {
            x: self.x.pad(margin),
            y: self.y.pad(margin),
            z: self.z.pad(margin),
        }
    }

    /// Returns true if the box contains nothing.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Minimum corner.
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// Maximum corner.
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Per-axis size.
    pub fn extent(&self) -> Vec3 {
        Vec3::new(self.x.size(), self.y.size(), self.z.size())
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    /// Clip the segment `start..end` against the box (Liang-Barsky).
    ///
    /// Returns the parametric sub-range of the segment that lies inside the
    /// box, or `None` when the segment misses it. The planes are tested in
    /// the fixed order -x, +x, -y, +y, -z, +z.
    pub fn clip_segment(&self, start: Vec3, end: Vec3) -> Option<Interval> {
        let d = end - start;
        let min = self.min();
        let max = self.max();
        let mut range = Interval::UNIT;

        for axis in 0..3 {
            if !clip_plane(-d[axis], start[axis] - min[axis], &mut range) {
                return None;
            }
            if !clip_plane(d[axis], max[axis] - start[axis], &mut range) {
                return None;
            }
        }
        Some(range)
    }

    /// An empty box that `include` grows from.
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}

/// One Liang-Barsky boundary test: `p` is the signed direction component
/// against the boundary, `q` the signed distance to it.
fn clip_plane(p: f32, q: f32, range: &mut Interval) -> bool {
    if p < 0.0 {
        if q < p {
            return false;
        }
        if q < 0.0 {
            let r = q / p;
            if r > range.max {
                return false;
            }
            if r > range.min {
                range.min = r;
            }
        }
    } else if p > 0.0 {
        if q < 0.0 {
            return false;
        }
        if q < p {
            let r = q / p;
            if r < range.min {
                return false;
            }
            if r < range.max {
                range.max = r;
            }
        }
    } else if q < 0.0 {
        return false;
    }
    true
}

//! OcVal: per-cell occupancy masks.
//!
//! Each octree cell is split into 16 slabs along every axis. A face stored in
//! a cell records which slabs its bounding box touches, one 16-bit row mask
//! per axis; a ray records the same for the piece of its segment inside the
//! cell. If any axis has no slab in common, the face cannot be hit there.

/// Highest slab index inside a cell.
pub const OCVAL_RES: i32 = 15;

/// Mask with bits `min..=max` set, both ends clamped to `[0, OCVAL_RES]`.
#[inline]
pub fn row_mask(min: i32, max: i32) -> u16 {
    let min = min.clamp(0, OCVAL_RES);
    let max = max.clamp(0, OCVAL_RES);
    let upper: u32 = if max >= OCVAL_RES {
        0xFFFF
    } else {
        (1 << (max + 1)) - 1
    };
    let lower: u32 = if min > 0 { (1 << min) - 1 } else { 0 };
    (upper & !lower) as u16
}

/// Row mask for the span `lo..=hi`, given in grid units relative to the
/// cell's lower corner. Values are truncated, not rounded.
#[inline]
fn span_mask(lo: f32, hi: f32) -> u16 {
    let res = OCVAL_RES as f32;
    row_mask((res * lo) as i32, (res * hi) as i32)
}

/// Three row masks, one per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OcVal {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl OcVal {
    pub const FULL: OcVal = OcVal {
        x: 0xFFFF,
        y: 0xFFFF,
        z: 0xFFFF,
    };

    /// Mask of a grid-space box inside cell `cell`.
    pub fn from_bounds(min: glam::Vec3, max: glam::Vec3, cell: glam::IVec3) -> Self {
        let origin = cell.as_vec3();
        let lo = min - origin;
        let hi = max - origin;
        Self {
            x: span_mask(lo.x, hi.x),
            y: span_mask(lo.y, hi.y),
            z: span_mask(lo.z, hi.z),
        }
    }

    /// Mask of the grid-space segment `a..b` inside cell `cell`.
    pub fn from_segment(a: glam::Vec3, b: glam::Vec3, cell: glam::IVec3) -> Self {
        Self::from_bounds(a.min(b), a.max(b), cell)
    }

    /// True when the masks share a slab on every axis.
    #[inline]
    pub fn overlaps(&self, other: &OcVal) -> bool {
        (self.x & other.x) != 0 && (self.y & other.y) != 0 && (self.z & other.z) != 0
    }
}

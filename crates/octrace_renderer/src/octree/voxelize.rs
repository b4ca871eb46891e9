//! Face voxelization helpers for the octree builder.
//!
//! A face is drawn into three projection bitmaps (xy, xz, yz): edges with a
//! 2D DDA, interiors with a per-column fill. A grid cell can only touch the
//! face when all three of its projections are set and the face plane passes
//! through it.

use glam::{IVec3, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Projection {
    Xy,
    Xz,
    Yz,
}

impl Projection {
    pub const ALL: [Projection; 3] = [Projection::Xy, Projection::Xz, Projection::Yz];

    /// Grid axes spanning the projection plane.
    fn axes(self) -> (usize, usize) {
        match self {
            Projection::Xy => (0, 1),
            Projection::Xz => (0, 2),
            Projection::Yz => (1, 2),
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Scratch bitmaps, reused for every face of a build.
pub(crate) struct Rasterizer {
    res: i32,
    planes: [Vec<bool>; 3],
}

impl Rasterizer {
    pub fn new(resolution: u32) -> Self {
        let cells = (resolution * resolution) as usize;
        Self {
            res: resolution as i32,
            planes: [vec![false; cells], vec![false; cells], vec![false; cells]],
        }
    }

    #[inline]
    fn in_range(&self, a: i32, b: i32) -> bool {
        (0..self.res).contains(&a) && (0..self.res).contains(&b)
    }

    #[inline]
    pub fn is_set(&self, proj: Projection, a: i32, b: i32) -> bool {
        self.in_range(a, b) && self.planes[proj.slot()][(a * self.res + b) as usize]
    }

    #[inline]
    fn mark(&mut self, proj: Projection, a: i32, b: i32) {
        if self.in_range(a, b) {
            self.planes[proj.slot()][(a * self.res + b) as usize] = true;
        }
    }

    /// Draw and fill a grid-space polygon whose cells lie in `lo..=hi`.
    pub fn rasterize(&mut self, corners: &[Vec3], lo: IVec3, hi: IVec3) {
        for proj in Projection::ALL {
            for (i, &from) in corners.iter().enumerate() {
                let to = corners[(i + 1) % corners.len()];
                self.draw_edge(proj, from, to);
            }
            self.fill(proj, lo, hi);
        }
    }

    /// Mark every cell the projected segment `from..to` passes through.
    pub fn draw_edge(&mut self, proj: Projection, from: Vec3, to: Vec3) {
        let (c1, c2) = proj.axes();
        let (mut x, mut y) = (from[c1] as i32, from[c2] as i32);
        let (x2, y2) = (to[c1] as i32, to[c2] as i32);

        if x == x2 && y == y2 {
            self.mark(proj, x, y);
            return;
        }

        let (mut labda_x, ld_x, step_x) = edge_axis(from[c1], to[c1], x);
        let (mut labda_y, ld_y, step_y) = edge_axis(from[c2], to[c2], y);
        let mut labda = labda_x.min(labda_y);

        // The walk ends at labda >= 1; the cap only matters for NaN input.
        for _ in 0..2 * self.res + 2 {
            self.mark(proj, x, y);
            let labda_o = labda;

            if labda_x == labda_y {
                labda_x += ld_x;
                x += step_x;
                labda_y += ld_y;
                y += step_y;
            } else if labda_x < labda_y {
                labda_x += ld_x;
                x += step_x;
            } else {
                labda_y += ld_y;
                y += step_y;
            }

            labda = labda_x.min(labda_y);
            if labda == labda_o || labda >= 1.0 {
                break;
            }
        }
        self.mark(proj, x2, y2);
    }

    /// Fill every column of the projection between its first and last set cell.
    pub fn fill(&mut self, proj: Projection, lo: IVec3, hi: IVec3) {
        let (c1, c2) = proj.axes();
        for a in lo[c1]..=hi[c1] {
            let first = (lo[c2]..=hi[c2]).find(|&b| self.is_set(proj, a, b));
            let last = (lo[c2]..=hi[c2]).rev().find(|&b| self.is_set(proj, a, b));
            if let (Some(first), Some(last)) = (first, last) {
                for b in first..=last {
                    self.mark(proj, a, b);
                }
            }
        }
    }

    /// Reset the cells a face could have touched.
    pub fn clear(&mut self, lo: IVec3, hi: IVec3) {
        for proj in Projection::ALL {
            let (c1, c2) = proj.axes();
            for a in lo[c1].max(0)..=hi[c1].min(self.res - 1) {
                let row = (a * self.res) as usize;
                let from = row + lo[c2].max(0) as usize;
                let to = row + hi[c2].min(self.res - 1) as usize;
                if from <= to {
                    self.planes[proj.slot()][from..=to].fill(false);
                }
            }
        }
    }
}

/// Start parameter, parameter step and cell step of one axis of a 2D walk.
fn edge_axis(from: f32, to: f32, cell: i32) -> (f32, f32, i32) {
    if to > from {
        let d = to - from;
        ((cell as f32 + 1.0 - from) / d, 1.0 / d, 1)
    } else if to < from {
        let d = from - to;
        ((from - cell as f32) / d, 1.0 / d, -1)
    } else {
        (1.0, 0.0, 0)
    }
}

/// Face plane in grid space.
pub(crate) struct CellPlane {
    normal: Vec3,
    d: f32,
}

impl CellPlane {
    pub fn through(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (a - b).cross(b - c).normalize_or_zero();
        Self {
            normal,
            d: -normal.dot(a),
        }
    }

    /// True when the plane passes through (or touches) the unit cell.
    pub fn touches_cell(&self, cell: IVec3) -> bool {
        if self.normal == Vec3::ZERO {
            return true;
        }
        let center = cell.as_vec3() + Vec3::splat(0.5);
        let distance = self.normal.dot(center) + self.d;
        let reach = 0.5 * self.normal.abs().element_sum();
        distance.abs() <= reach
    }
}

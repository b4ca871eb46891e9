//! Counters for octree builds and casts.
//!
//! Casts take a `&mut RayStats` owned by the caller (one per worker), so
//! counting never needs shared state.

use std::ops::AddAssign;

/// Summary of an octree build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Faces stored in at least one cell
    pub faces_inserted: usize,
    /// Faces left out (not traceable, wire, or non-finite)
    pub faces_skipped: usize,
    pub branches: usize,
    pub nodes: usize,
    /// Face entries over all cells
    pub cell_refs: usize,
}

/// Per-worker ray counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RayStats {
    /// Octree casts
    pub rays: u64,
    /// Casts rejected by the bounding box clip
    pub clip_rejects: u64,
    /// Cells visited by traversal
    pub cells_visited: u64,
    /// Candidates that passed the OcVal test
    pub mask_accepts: u64,
    /// Candidates culled by the OcVal test
    pub mask_rejects: u64,
    pub hits: u64,
    /// Shading rays issued by the recursive tracer
    pub traced: u64,
}

impl AddAssign for RayStats {
    fn add_assign(&mut self, other: RayStats) {
        self.rays += other.rays;
        self.clip_rejects += other.clip_rejects;
        self.cells_visited += other.cells_visited;
        self.mask_accepts += other.mask_accepts;
        self.mask_rejects += other.mask_rejects;
        self.hits += other.hits;
        self.traced += other.traced;
    }
}

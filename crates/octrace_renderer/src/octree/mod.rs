//! Sparse octree over the traceable faces of a scene.
//!
//! The grid is `resolution`³ cells over the padded scene bounds. Branches
//! hold eight child handles; the last branch level points at leaf nodes,
//! which store up to eight faces with their OcVal masks and chain to a
//! continuation node when full.
//!
//! An octree borrows its scene, so faces cannot change while it exists.
//! Dropping it releases all storage.

mod arena;
mod voxelize;

use glam::{IVec3, Vec3};
use octrace_core::{FaceId, Scene};
use octrace_math::Aabb;
use serde::{Deserialize, Serialize};

use crate::error::{OctreeError, OctreeResult, Pool};
use crate::ocval::OcVal;
use crate::stats::BuildStats;
use arena::Arena;
use voxelize::{CellPlane, Projection, Rasterizer};

/// Grid resolutions the builder accepts.
pub const SUPPORTED_RESOLUTIONS: [u32; 4] = [64, 128, 256, 512];

/// Face slots per leaf node.
pub(crate) const NODE_SLOTS: usize = 8;

/// Octree build settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Cells per axis (64, 128, 256 or 512)
    pub resolution: u32,

    /// Branch arena limit, in slabs of 4096 branches
    pub max_branch_slabs: usize,

    /// Node arena limit, in slabs of 4096 nodes
    pub max_node_slabs: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            resolution: 128,
            max_branch_slabs: 1024,
            max_node_slabs: 4096,
        }
    }
}

impl OctreeConfig {
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct Branch {
    /// 0 means no child (the root is never a child)
    children: [u32; 8],
}

#[derive(Clone, Copy, Default)]
pub(crate) struct Node {
    faces: [Option<FaceId>; NODE_SLOTS],
    ocval: [OcVal; NODE_SLOTS],
    next: Option<u32>,
}

/// Child slot of `cell` at the given level (0 = leaf).
#[inline]
fn octant(cell: IVec3, level: u32) -> usize {
    ((((cell.x >> level) & 1) << 2) | (((cell.y >> level) & 1) << 1) | ((cell.z >> level) & 1))
        as usize
}

pub struct Octree<'s> {
    scene: &'s Scene,
    branches: Arena<Branch>,
    nodes: Arena<Node>,
    bounds: Aabb,
    /// World-to-grid scale per axis
    ocfac: Vec3,
    /// Length of the bounds diagonal
    size: f32,
    resolution: u32,
    levels: u32,
    stats: BuildStats,
}

impl<'s> Octree<'s> {
    /// Build the octree for every traceable face of `scene`.
    ///
    /// A scene without traceable faces gives an empty octree in which every
    /// cast misses.
    pub fn build(scene: &'s Scene, config: &OctreeConfig) -> OctreeResult<Self> {
        let resolution = config.resolution;
        if !SUPPORTED_RESOLUTIONS.contains(&resolution) {
            return Err(OctreeError::UnsupportedResolution(resolution));
        }

        let mut octree = Octree {
            scene,
            branches: Arena::new(Pool::Branch, config.max_branch_slabs),
            nodes: Arena::new(Pool::Node, config.max_node_slabs),
            bounds: Aabb::EMPTY,
            ocfac: Vec3::ZERO,
            size: 0.0,
            resolution,
            levels: resolution.trailing_zeros(),
            stats: BuildStats::default(),
        };

        let mut bounds = Aabb::EMPTY;
        let mut candidates = Vec::new();
        for (id, face) in scene.faces() {
            if !scene.face_material(face).is_traceable() {
                octree.stats.faces_skipped += 1;
                continue;
            }
            let (corners, count) = scene.face_corners(face);
            let corners = &corners[..count];
            if face.normal == Vec3::ZERO || !corners.iter().all(|p| p.is_finite()) {
                log::warn!("Skipping degenerate face {}", id.0);
                octree.stats.faces_skipped += 1;
                continue;
            }
            bounds = corners.iter().fold(bounds, |b, p| b.include(*p));
            candidates.push(id);
        }

        if candidates.is_empty() {
            log::debug!("No traceable faces in '{}', octree is empty", scene.name);
            return Ok(octree);
        }

        let bounds = bounds.pad(0.01);
        let extent = bounds.extent();
        octree.bounds = bounds;
        octree.ocfac = (resolution as f32 - 0.1) / extent;
        octree.size = extent.length();

        // Root branch, then a reserved node so handle 0 can mean "none"
        octree.branches.alloc()?;
        octree.nodes.alloc()?;

        let mut raster = Rasterizer::new(resolution);
        for id in candidates {
            octree.insert_face(id, &mut raster)?;
        }

        octree.stats.branches = octree.branches.len();
        octree.stats.nodes = octree.nodes.len() - 1;
        log::info!(
            "Octree built: {} faces in {} cells ({} branches, {} nodes, resolution {})",
            octree.stats.faces_inserted,
            octree.stats.cell_refs,
            octree.stats.branches,
            octree.stats.nodes,
            resolution
        );

        Ok(octree)
    }

    fn insert_face(&mut self, id: FaceId, raster: &mut Rasterizer) -> OctreeResult<()> {
        let scene = self.scene;
        let (corners, count) = scene.face_corners(scene.face(id));
        let mut grid = [Vec3::ZERO; 4];
        for (g, c) in grid.iter_mut().zip(&corners[..count]) {
            *g = self.to_grid(*c);
        }
        let grid = &grid[..count];

        let max_cell = IVec3::splat(self.resolution as i32 - 1);
        let mut lo = max_cell;
        let mut hi = IVec3::ZERO;
        let mut grid_min = Vec3::INFINITY;
        let mut grid_max = Vec3::NEG_INFINITY;
        for p in grid {
            let cell = p.as_ivec3().clamp(IVec3::ZERO, max_cell);
            lo = lo.min(cell);
            hi = hi.max(cell);
            grid_min = grid_min.min(*p);
            grid_max = grid_max.max(*p);
        }

        raster.rasterize(grid, lo, hi);
        let plane = CellPlane::through(grid[0], grid[1], grid[2]);

        let mut refs = 0;
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                if !raster.is_set(Projection::Xy, x, y) {
                    continue;
                }
                for z in lo.z..=hi.z {
                    if !raster.is_set(Projection::Yz, y, z) || !raster.is_set(Projection::Xz, x, z) {
                        continue;
                    }
                    let cell = IVec3::new(x, y, z);
                    if plane.touches_cell(cell) {
                        self.store(id, cell, OcVal::from_bounds(grid_min, grid_max, cell))?;
                        refs += 1;
                    }
                }
            }
        }
        raster.clear(lo, hi);

        if refs > 0 {
            self.stats.faces_inserted += 1;
        } else {
            self.stats.faces_skipped += 1;
        }
        self.stats.cell_refs += refs;
        Ok(())
    }

    /// Append a face to the leaf of `cell`, creating the path on demand.
    fn store(&mut self, id: FaceId, cell: IVec3, ocval: OcVal) -> OctreeResult<()> {
        let mut branch = 0;
        for level in (1..self.levels).rev() {
            let oc = octant(cell, level);
            let child = self.branches.get(branch).children[oc];
            branch = if child == 0 {
                let created = self.branches.alloc()?;
                self.branches.get_mut(branch).children[oc] = created;
                created
            } else {
                child
            };
        }

        let oc = octant(cell, 0);
        let mut node = self.branches.get(branch).children[oc];
        if node == 0 {
            node = self.nodes.alloc()?;
            self.branches.get_mut(branch).children[oc] = node;
        }
        while let Some(next) = self.nodes.get(node).next {
            node = next;
        }

        let slot = match self.nodes.get(node).faces.iter().position(Option::is_none) {
            Some(slot) => slot,
            None => {
                let next = self.nodes.alloc()?;
                self.nodes.get_mut(node).next = Some(next);
                node = next;
                0
            }
        };

        let entry = self.nodes.get_mut(node);
        entry.faces[slot] = Some(id);
        entry.ocval[slot] = ocval;
        Ok(())
    }

    /// Leaf node of a cell, if any face was stored there.
    pub(crate) fn lookup(&self, cell: IVec3) -> Option<u32> {
        let res = IVec3::splat(self.resolution as i32);
        if self.branches.is_empty() || cell.cmplt(IVec3::ZERO).any() || cell.cmpge(res).any() {
            return None;
        }

        let mut branch = 0;
        for level in (1..self.levels).rev() {
            let child = self.branches.get(branch).children[octant(cell, level)];
            if child == 0 {
                return None;
            }
            branch = child;
        }
        let node = self.branches.get(branch).children[octant(cell, 0)];
        (node != 0).then_some(node)
    }

    /// Faces and masks of a leaf, following continuation nodes.
    pub(crate) fn node_entries(&self, node: u32) -> NodeEntries<'_> {
        NodeEntries {
            nodes: &self.nodes,
            node: Some(node),
            slot: 0,
        }
    }

    /// Faces stored in a grid cell.
    pub fn cell_faces(&self, cell: IVec3) -> Vec<FaceId> {
        self.lookup(cell)
            .map(|node| self.node_entries(node).map(|(face, _)| face).collect())
            .unwrap_or_default()
    }

    /// World-space bounds of a grid cell.
    pub fn cell_bounds(&self, cell: IVec3) -> Aabb {
        let min = self.bounds.min() + cell.as_vec3() / self.ocfac;
        Aabb::from_points(min, min + Vec3::ONE / self.ocfac)
    }

    /// World position to continuous grid coordinates.
    #[inline]
    pub fn to_grid(&self, p: Vec3) -> Vec3 {
        (p - self.bounds.min()) * self.ocfac
    }

    pub fn scene(&self) -> &'s Scene {
        self.scene
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Padded bounds of the traceable faces (`Aabb::EMPTY` when empty).
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Diagonal of the bounds; long enough to cross the whole octree.
    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

pub(crate) struct NodeEntries<'a> {
    nodes: &'a Arena<Node>,
    node: Option<u32>,
    slot: usize,
}

impl Iterator for NodeEntries<'_> {
    type Item = (FaceId, OcVal);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.nodes.get(self.node?);
            if self.slot < NODE_SLOTS {
                if let Some(face) = node.faces[self.slot] {
                    let ocval = node.ocval[self.slot];
                    self.slot += 1;
                    return Some((face, ocval));
                }
            }
            // Slots fill in order, so an empty slot ends this node
            self.node = node.next;
            self.slot = 0;
        }
    }
}

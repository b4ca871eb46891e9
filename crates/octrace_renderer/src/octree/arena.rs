//! Slab arenas for octree branches and nodes.
//!
//! Entries are addressed by `u32` handles. Storage grows one fixed-size slab
//! at a time, so handles stay valid while the arena grows; past the slab
//! limit allocation fails instead of reusing entries.

use crate::error::{OctreeError, OctreeResult, Pool};

/// Entries per slab.
pub(crate) const SLAB_SIZE: usize = 4096;
const SLAB_SHIFT: u32 = 12;
const SLAB_MASK: u32 = (SLAB_SIZE as u32) - 1;

pub(crate) struct Arena<T> {
    slabs: Vec<Box<[T]>>,
    len: usize,
    max_slabs: usize,
    pool: Pool,
}

impl<T: Clone + Default> Arena<T> {
    pub fn new(pool: Pool, max_slabs: usize) -> Self {
        Self {
            slabs: Vec::new(),
            len: 0,
            max_slabs,
            pool,
        }
    }

    /// Allocate a default entry and return its handle.
    pub fn alloc(&mut self) -> OctreeResult<u32> {
        if self.len == self.slabs.len() * SLAB_SIZE {
            if self.slabs.len() >= self.max_slabs {
                return Err(OctreeError::CapacityExceeded {
                    pool: self.pool,
                    capacity: self.max_slabs * SLAB_SIZE,
                });
            }
            self.slabs
                .push(vec![T::default(); SLAB_SIZE].into_boxed_slice());
        }
        let handle = self.len as u32;
        self.len += 1;
        Ok(handle)
    }

    #[inline]
    pub fn get(&self, handle: u32) -> &T {
        &self.slabs[(handle >> SLAB_SHIFT) as usize][(handle & SLAB_MASK) as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, handle: u32) -> &mut T {
        &mut self.slabs[(handle >> SLAB_SHIFT) as usize][(handle & SLAB_MASK) as usize]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

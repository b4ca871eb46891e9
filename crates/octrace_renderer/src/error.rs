use std::fmt;

use octrace_core::SceneError;
use thiserror::Error;

/// Which octree arena ran out of room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pool {
    Branch,
    Node,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pool::Branch => f.write_str("branch"),
            Pool::Node => f.write_str("node"),
        }
    }
}

/// Errors that can occur while building an octree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OctreeError {
    #[error("unsupported octree resolution {0} (use 64, 128, 256 or 512)")]
    UnsupportedResolution(u32),

    #[error("octree {pool} pool exhausted ({capacity} entries)")]
    CapacityExceeded { pool: Pool, capacity: usize },
}

/// Result type for octree operations.
pub type OctreeResult<T> = Result<T, OctreeError>;

/// Errors that can occur while rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("octree build failed: {0}")]
    Octree(#[from] OctreeError),

    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("render cancelled")]
    Cancelled,

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

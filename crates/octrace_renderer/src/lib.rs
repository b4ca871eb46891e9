//! Octrace Renderer - octree ray tracing for polygon scenes.
//!
//! Faces are voxelized into a fixed-resolution octree whose leaf nodes
//! carry an OcVal occupancy mask per face. Rays walk the octree with a
//! 3D-DDA and test only the faces whose mask overlaps the ray's span
//! through the cell.
//!
//! On top of the octree sit:
//!
//! - **Tracing**: recursive mirror and transparency rays (`Tracer`)
//! - **Shadows**: hard and sampled area-light shadows, with transparent occluders
//! - **Ambient occlusion**: hemisphere sampling with optional sky colour
//! - **Rendering**: camera rays rendered in parallel buckets
//!
//! # Example
//!
//! ```ignore
//! use octrace_renderer::{render, Camera, Octree, PhongShader, RenderConfig, Tracer};
//!
//! let config = RenderConfig::default();
//! let octree = Octree::build(&scene, &config.octree)?;
//! let tracer = Tracer::new(&octree, &PhongShader, &scene.world, &config);
//! let output = render(&tracer, &camera, &config)?;
//! output.image.save_png("render.png")?;
//! ```

pub mod ao;
pub mod bucket;
pub mod camera;
pub mod context;
pub mod dda;
pub mod error;
pub mod intersect;
pub mod isect;
pub mod jitter;
pub mod ocval;
pub mod octree;
pub mod renderer;
pub mod shader;
pub mod shadow;
pub mod stats;
pub mod trace;

#[cfg(test)]
mod testutil;

pub use ao::AoSphere;
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use camera::Camera;
pub use context::RayContext;
pub use dda::{RayHit, RayQuery};
pub use error::{OctreeError, OctreeResult, RenderError, RenderResult};
pub use isect::{DdaMode, Isect};
pub use jitter::JitterTable;
pub use ocval::OcVal;
pub use octree::{Octree, OctreeConfig};
pub use renderer::{
    color_to_rgba, render, render_pixel, render_with_cancel, ImageBuffer, RenderConfig,
    RenderOutput,
};
pub use shader::{fresnel_fac, PhongShader, ShadeInput, ShadeResult, Sky, SurfaceShader};
pub use stats::{BuildStats, RayStats};
pub use trace::{reflection, refraction, TraceDepth, Tracer};

/// Re-export the math types used in the public API
pub use octrace_math::{Aabb, Interval, Ray, Vec3};

//! Octrace Core - Scene model consumed by the octree tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` and `Polygon` builders, the flat `Scene` face list
//! - **Surfaces**: `Material` with its mirror/transparency/shadow options
//! - **Lighting**: `Light` kinds, area-light sampling modes, `World` settings
//!
//! # Example
//!
//! ```ignore
//! use octrace_core::{Material, Mesh, Scene};
//! use octrace_math::Vec3;
//!
//! let mut scene = Scene::new("demo");
//! let grey = scene.add_material(Material::new("grey", Vec3::splat(0.8)))?;
//! scene.add_mesh(&Mesh::plane(Vec3::ZERO, 5.0), grey, false)?;
//! ```

pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use error::{SceneError, SceneResult};
pub use light::{Light, LightKind, SampleMode};
pub use material::{Material, Mirror, ShadowMode, Transparency};
pub use mesh::{Mesh, Polygon};
pub use scene::{AoColor, AoSettings, Face, FaceId, MaterialId, Scene, World};

/// RGB colour in linear space.
pub type Color = octrace_math::Vec3;

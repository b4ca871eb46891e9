// Re-export glam for convenience
pub use glam::*;

// Octrace math types
mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;

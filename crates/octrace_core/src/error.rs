use thiserror::Error;

/// Errors raised while assembling a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("vertex index {index} out of range ({count} vertices)")]
    InvalidVertex { index: u32, count: usize },

    #[error("faces need 3 or 4 vertices, got {0}")]
    BadPolygon(usize),

    #[error("unknown material id {0}")]
    UnknownMaterial(u32),

    #[error("light {light} has zero shadow samples")]
    ZeroSamples { light: usize },

    #[error("index of refraction must be positive and finite, got {0}")]
    InvalidIor(f32),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

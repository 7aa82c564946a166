use thiserror::Error;

/// Invalid module identity, parameters or neighbor coupling.
///
/// Raised at construction or mutation time, never deferred to `step`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    #[error("module name must be a non-empty string")]
    EmptyName,

    #[error("parameter `{key}` must be finite, got {value}")]
    NonFiniteParam { key: String, value: f64 },

    #[error("parameter `dt` must be positive, got {0}")]
    InvalidTimeStep(f64),

    #[error("invalid weight or delay for neighbor `{neighbor}`: {reason}")]
    InvalidCoupling { neighbor: String, reason: String },
}

use thiserror::Error;

/// Errors raised at the extraction call boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    /// Zero time points or a zero-volume frame.
    #[error("cannot extract connected components from an empty input")]
    EmptyInput,

    /// `min_size > max_size` or `max_size < 1`.
    #[error("invalid size bounds: min {min} > max {max} (max must be >= 1)")]
    InvalidBounds { min: usize, max: usize },

    /// The label population exceeded the arena index type. Callers are
    /// expected to split the volume.
    #[error("provisional label count exceeded the arena index type")]
    Overflow,

    /// Input and output grids (or frames of one series) disagree in shape.
    #[error("grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },
}

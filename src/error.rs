use thiserror::Error;

/// Errors raised while building, training or sampling a GAN.
#[derive(Debug, Error)]
pub enum GanError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    #[error("Wrong number of {what}: expected {expected}, got {actual}")]
    InputCount {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Generator index {index} out of range (model has {count} generators)")]
    InvalidGeneratorIndex { index: usize, count: usize },

    #[error("Conditional inputs are required by this model but none were given")]
    MissingConditionalInputs,

    #[error(transparent)]
    Tch(#[from] tch::TchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, GanError>;

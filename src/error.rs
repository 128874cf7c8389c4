use std::fmt;

/// Result type for DDPG operations
pub type Result<T> = std::result::Result<T, DdpgError>;

/// Main error type for the DDPG crate
#[derive(Debug, Clone, PartialEq)]
pub enum DdpgError {
    /// Invalid dimensions for operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Not enough stored transitions to serve a request
    InsufficientData {
        requested: usize,
        available: usize,
    },

    /// Training was asked to run on a batch with no rows
    EmptyBatch(String),

    /// Numerical computation errors (NaN, infinity)
    NumericalError(String),

    /// Training error
    TrainingError(String),

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),
}

impl fmt::Display for DdpgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdpgError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            DdpgError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            DdpgError::InsufficientData { requested, available } => {
                write!(
                    f,
                    "Insufficient data: requested {} transitions, only {} stored",
                    requested, available
                )
            }
            DdpgError::EmptyBatch(msg) => write!(f, "Empty batch: {}", msg),
            DdpgError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            DdpgError::TrainingError(msg) => write!(f, "Training error: {}", msg),
            DdpgError::IoError(msg) => write!(f, "IO error: {}", msg),
            DdpgError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for DdpgError {}

// Conversion from std::io::Error
impl From<std::io::Error> for DdpgError {
    fn from(err: std::io::Error) -> Self {
        DdpgError::IoError(err.to_string())
    }
}

// Conversion from bincode::Error
impl From<bincode::Error> for DdpgError {
    fn from(err: bincode::Error) -> Self {
        DdpgError::SerializationError(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for DdpgError {
    fn from(err: serde_json::Error) -> Self {
        DdpgError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl DdpgError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DdpgError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        DdpgError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

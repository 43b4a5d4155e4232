use thiserror::Error;

/// Errors raised by the transform engine and its configuration layer.
///
/// None of these are transient; they mean a caller or a configuration file
/// broke the contract, so nothing in the crate retries them.
#[derive(Debug, Error)]
pub enum KinematicsError {
    /// Unknown parameter-set selector, non-unit rotation axis, bad convention flag.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A vector did not have the length the model was configured with.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A required configuration field was absent.
    #[error("Missing configuration field `{0}`")]
    MissingConfiguration(String),

    #[error("Could not read configuration {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Dataset persistence failed.
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Could not spawn input thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl KinematicsError {
    pub(crate) fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        KinematicsError::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        KinematicsError::MissingConfiguration(field.to_string())
    }
}

impl From<csv::Error> for KinematicsError {
    fn from(e: csv::Error) -> Self {
        KinematicsError::Dataset(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KinematicsError>;

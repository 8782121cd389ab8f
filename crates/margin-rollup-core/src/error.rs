use thiserror::Error;

#[derive(Debug, Error)]
pub enum RollupError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid margin tier in {table}: {reason}")]
    InvalidTier { table: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RollupError {
    fn from(e: serde_json::Error) -> Self {
        RollupError::SerializationError(e.to_string())
    }
}

use thiserror::Error;

use varmap_ingest::IngestError;

/// Errors that abort an engine operation. Session state is left untouched.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input is well-formed but breaks an upload rule.
    #[error("validation failed: {message}")]
    Validation { message: String },
    /// Input could not be parsed as a table.
    #[error("could not parse input: {0}")]
    Parse(#[from] IngestError),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

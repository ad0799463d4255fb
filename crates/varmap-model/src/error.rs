use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid column name: {0:?}")]
    InvalidColumnName(String),
    #[error("invalid row key: {0:?}")]
    InvalidRowKey(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

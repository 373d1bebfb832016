//! Crate-level error type

use crate::catalog::CatalogError;
use crate::storage::StorageError;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EchoesError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Referenced question is not in the catalog
    #[error("Unknown question: {0}")]
    UnknownQuestion(u32),
    /// Reflection text was empty
    #[error("Reflection text is empty")]
    EmptyReflection,
    #[error("Reflection not found: {0}")]
    ReflectionNotFound(String),
}

pub type Result<T> = std::result::Result<T, EchoesError>;

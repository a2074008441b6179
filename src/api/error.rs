use thiserror::Error;

use crate::platforms::traits::ExtractError;
use crate::storage::jobs::StorageError;

/// Operation-level failures, carrying the HTTP status an embedding server
/// should answer with. The crate itself never speaks HTTP.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotDone(String),
    #[error("{0}")]
    NotFound(String),
    #[error("falha na extração: {0}")]
    Extraction(#[from] ExtractError),
    #[error("falha no armazenamento: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) | ApiError::NotDone(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Extraction(_) => 502,
            ApiError::Storage(_) => 500,
        }
    }
}

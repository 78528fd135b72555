use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("storage backend failure: {0}")]
    Backend(#[from] sled::Error),

    #[error("failed to encode or decode record: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    #[cfg(test)]
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

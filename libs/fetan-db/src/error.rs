use thiserror::Error;

/// Failure taxonomy shared by the services and the API layer.
///
/// `Database` and `Internal` carry details that must not reach
/// customers; the API layer logs them and answers with a generic
/// message.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: i64 },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }
}

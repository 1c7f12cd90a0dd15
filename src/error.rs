use crate::domain::ProductId;
use thiserror::Error;

/// Errors surfaced by the commerce core.
///
/// The first five variants form the caller-facing taxonomy and map to 4xx
/// responses at whatever transport hosts the engines; the rest are plumbing.
#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("insufficient stock for product {product}. Available: {available}")]
    InsufficientStock { product: ProductId, available: u32 },
    #[error("too many requests. Please try again later")]
    RateLimited,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CommerceError>;

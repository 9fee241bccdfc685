//! Shared error taxonomy for the result lifecycle engine.
//!
//! A single enum is the currency between repositories, domain services and
//! the HTTP boundary. The boundary owns the one mapping to status codes;
//! everything below it only ever constructs or propagates `IvdError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IvdError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{0} cannot be modified")]
    Immutable(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl IvdError {
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} '{}'", entity.into(), id))
    }
}

pub type IvdResult<T> = std::result::Result<T, IvdError>;

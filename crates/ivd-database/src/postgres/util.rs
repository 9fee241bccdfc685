//! Shared helpers for the Postgres repository realizations.

use ivd_domain::IvdError;
use sqlx::Error as SqlxError;

/// Postgres `unique_violation` is SQLSTATE 23505.
pub fn map_err(entity: &str, err: SqlxError) -> IvdError {
    if let SqlxError::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return IvdError::Conflict(format!("{entity} already exists"));
        }
    }
    IvdError::Upstream(format!("{entity} query failed: {err}"))
}

pub fn not_found(entity: &str, id: impl std::fmt::Display) -> IvdError {
    IvdError::not_found(entity, id)
}

pub mod cart_repo;
pub mod catalog_repo;
pub mod coupon_repo;
pub mod models;
pub mod order_repo;
pub mod payment_repo;

#[cfg(test)]
pub mod testutil;

use crate::domain::errors::DomainError;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match &e {
            // Serialization failures and lock-wait timeouts both mean another
            // writer got there first; callers may retry.
            Error::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
                DomainError::ConcurrentModification
            }
            Error::DatabaseError(_, info) if info.message().contains("lock timeout") => {
                DomainError::ConcurrentModification
            }
            _ => DomainError::Internal(e.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

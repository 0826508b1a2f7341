use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

/// One product the checkout could not fully satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortage {
    pub product_id: Uuid,
    pub requested: i32,
    pub available: i32,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Product {product_id} has {available} unit(s) in stock, requested {requested}")]
    OutOfStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },
    #[error("Insufficient stock for {} product(s)", .shortages.len())]
    InsufficientStock { shortages: Vec<StockShortage> },
    #[error("Coupon not found")]
    CouponNotFound,
    #[error("Coupon is not active")]
    CouponInactive,
    #[error("Coupon has expired")]
    CouponExpired,
    #[error("Coupon usage limit reached")]
    CouponExhausted,
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Payment amount {actual} does not match order total {expected}")]
    AmountMismatch {
        expected: BigDecimal,
        actual: BigDecimal,
    },
    #[error("Concurrent modification, retry the operation")]
    ConcurrentModification,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Stable machine-readable code carried in every HTTP error body.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::EmptyCart => "empty_cart",
            DomainError::OutOfStock { .. } => "out_of_stock",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::CouponNotFound => "coupon_not_found",
            DomainError::CouponInactive => "coupon_inactive",
            DomainError::CouponExpired => "coupon_expired",
            DomainError::CouponExhausted => "coupon_exhausted",
            DomainError::InvalidTransition { .. } => "invalid_transition",
            DomainError::AmountMismatch { .. } => "amount_mismatch",
            DomainError::ConcurrentModification => "concurrent_modification",
            DomainError::Internal(_) => "internal_error",
        }
    }
}

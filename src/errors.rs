use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_for(code: &str) -> StatusCode {
    match code {
        "validation_error" | "empty_cart" => StatusCode::BAD_REQUEST,
        "not_found" | "coupon_not_found" => StatusCode::NOT_FOUND,
        "out_of_stock"
        | "insufficient_stock"
        | "coupon_inactive"
        | "coupon_expired"
        | "coupon_exhausted"
        | "invalid_transition"
        | "amount_mismatch"
        | "concurrent_modification" => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(e) => status_for(e.code()),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            // Internal details stay in the logs, never in the response body.
            AppError::Internal(_) | AppError::Domain(DomainError::Internal(_)) => {
                log::error!("{}", self);
                HttpResponse::InternalServerError().json(json!({
                    "code": "internal_error",
                    "error": "Internal server error"
                }))
            }
            AppError::Domain(DomainError::InsufficientStock { shortages }) => {
                let details: Vec<serde_json::Value> = shortages
                    .iter()
                    .map(|s| {
                        json!({
                            "product_id": s.product_id,
                            "requested": s.requested,
                            "available": s.available
                        })
                    })
                    .collect();
                HttpResponse::Conflict().json(json!({
                    "code": "insufficient_stock",
                    "error": self.to_string(),
                    "details": details
                }))
            }
            AppError::Domain(e) => HttpResponse::build(status_for(e.code())).json(json!({
                "code": e.code(),
                "error": self.to_string()
            })),
        }
    }
}

use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::payment::{PaymentEvent, PaymentMethod, PaymentView};
use crate::errors::AppError;
use crate::AppPaymentService;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    /// One of PIX, CREDIT_CARD, DEBIT_CARD, BOLETO.
    pub method: String,
    /// Decimal amount as a string to avoid floating-point issues, e.g. "729.90".
    /// Must equal the order total.
    pub amount: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentEventRequest {
    /// Gateway outcome: one of PAID, FAILED, REFUNDED.
    pub event: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub amount: String,
    pub paid_at: Option<String>,
    pub created_at: String,
}

impl From<PaymentView> for PaymentResponse {
    fn from(payment: PaymentView) -> Self {
        PaymentResponse {
            id: payment.id,
            order_id: payment.order_id,
            method: payment.method.as_str().to_string(),
            status: payment.status.as_str().to_string(),
            transaction_id: payment.transaction_id,
            amount: payment.amount.to_string(),
            paid_at: payment.paid_at.map(|t| t.to_rfc3339()),
            created_at: payment.created_at.to_rfc3339(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders/{id}/payment
///
/// Opens a PENDING payment for the order. The amount must match the order
/// total exactly; each order takes at most one payment.
#[utoipa::path(
    post,
    path = "/orders/{id}/payment",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = InitiatePaymentRequest,
    responses(
        (status = 201, description = "Payment initiated", body = PaymentResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Amount mismatch or order already closed"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "payments"
)]
pub async fn initiate_payment(
    svc: web::Data<AppPaymentService>,
    path: web::Path<Uuid>,
    body: web::Json<InitiatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();

    let method = PaymentMethod::parse(&body.method)
        .ok_or_else(|| DomainError::Validation(format!("Invalid payment method '{}'", body.method)))?;
    let amount = BigDecimal::from_str(&body.amount)
        .map_err(|e| DomainError::Validation(format!("Invalid amount '{}': {}", body.amount, e)))?;

    let payment = web::block(move || svc.initiate_payment(order_id, method, amount))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(PaymentResponse::from(payment)))
}

/// POST /orders/{id}/payment/events
///
/// Records a gateway outcome for the order's payment. PAID marks the order
/// paid, FAILED leaves it awaiting a new attempt, REFUNDED cancels any order
/// not yet delivered and restores its stock.
#[utoipa::path(
    post,
    path = "/orders/{id}/payment/events",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = PaymentEventRequest,
    responses(
        (status = 200, description = "Payment after applying the event", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Event not applicable in the current state"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "payments"
)]
pub async fn record_payment_event(
    svc: web::Data<AppPaymentService>,
    path: web::Path<Uuid>,
    body: web::Json<PaymentEventRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();

    let event = PaymentEvent::parse(&body.event, body.transaction_id)
        .ok_or_else(|| DomainError::Validation(format!("Invalid payment event '{}'", body.event)))?;

    let payment = web::block(move || svc.record_event(order_id, event))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
}

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Pix,
    CreditCard,
    DebitCard,
    Boleto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "PIX",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::DebitCard => "DEBIT_CARD",
            PaymentMethod::Boleto => "BOLETO",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentMethod> {
        match s {
            "PIX" => Some(PaymentMethod::Pix),
            "CREDIT_CARD" => Some(PaymentMethod::CreditCard),
            "DEBIT_CARD" => Some(PaymentMethod::DebitCard),
            "BOLETO" => Some(PaymentMethod::Boleto),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentStatus> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// A pending payment settles or fails; only a settled payment refunds.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incoming gateway notification about a payment.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    Paid { transaction_id: Option<String> },
    Failed,
    Refunded,
}

impl PaymentEvent {
    pub fn parse(s: &str, transaction_id: Option<String>) -> Option<PaymentEvent> {
        match s {
            "PAID" => Some(PaymentEvent::Paid { transaction_id }),
            "FAILED" => Some(PaymentEvent::Failed),
            "REFUNDED" => Some(PaymentEvent::Refunded),
            _ => None,
        }
    }

    pub fn target_status(&self) -> PaymentStatus {
        match self {
            PaymentEvent::Paid { .. } => PaymentStatus::Paid,
            PaymentEvent::Failed => PaymentStatus::Failed,
            PaymentEvent::Refunded => PaymentStatus::Refunded,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub amount: BigDecimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::PaymentStatus::*;
    use super::*;

    #[test]
    fn settlement_transitions() {
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Failed));
        assert!(Paid.can_transition_to(Refunded));

        assert!(!Paid.can_transition_to(Paid));
        assert!(!Failed.can_transition_to(Paid));
        assert!(!Refunded.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Refunded));
    }

    #[test]
    fn event_parse_maps_to_target_status() {
        let paid = PaymentEvent::parse("PAID", Some("tx-123".to_string())).unwrap();
        assert_eq!(paid.target_status(), Paid);

        assert_eq!(
            PaymentEvent::parse("FAILED", None).unwrap().target_status(),
            Failed
        );
        assert_eq!(
            PaymentEvent::parse("REFUNDED", None).unwrap().target_status(),
            Refunded
        );
        assert!(PaymentEvent::parse("CHARGEBACK", None).is_none());
    }

    #[test]
    fn method_parse_roundtrips() {
        for method in [
            PaymentMethod::Pix,
            PaymentMethod::CreditCard,
            PaymentMethod::DebitCard,
            PaymentMethod::Boleto,
        ] {
            assert_eq!(PaymentMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(PaymentMethod::parse("CASH"), None);
    }
}

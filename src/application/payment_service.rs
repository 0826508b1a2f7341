use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::payment::{PaymentEvent, PaymentMethod, PaymentView};
use crate::domain::ports::PaymentRepository;

pub struct PaymentService<R> {
    repo: R,
}

impl<R: PaymentRepository> PaymentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn initiate_payment(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
        amount: BigDecimal,
    ) -> Result<PaymentView, DomainError> {
        self.repo.initiate(order_id, method, amount)
    }

    pub fn record_event(
        &self,
        order_id: Uuid,
        event: PaymentEvent,
    ) -> Result<PaymentView, DomainError> {
        self.repo.record_event(order_id, event)
    }
}

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{OrderListResult, OrderStatus, OrderView};
use crate::domain::ports::OrderRepository;

use super::settings::Settings;

pub struct OrderService<R> {
    repo: R,
    settings: Settings,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R, settings: Settings) -> Self {
        Self { repo, settings }
    }

    pub fn checkout(
        &self,
        user_id: Uuid,
        shipping_address_id: Uuid,
        coupon_code: Option<&str>,
    ) -> Result<OrderView, DomainError> {
        self.repo.checkout(
            user_id,
            shipping_address_id,
            coupon_code,
            self.settings.shipping_flat_rate.clone(),
        )
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn list_orders(
        &self,
        user_id: Uuid,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<OrderListResult, DomainError> {
        self.repo.list_for_user(user_id, status, page, limit)
    }

    pub fn cancel_order(&self, id: Uuid) -> Result<OrderView, DomainError> {
        self.repo.cancel(id)
    }

    pub fn update_status(&self, id: Uuid, next: OrderStatus) -> Result<OrderView, DomainError> {
        self.repo.update_status(id, next)
    }

    pub fn recalculate_totals(&self, id: Uuid) -> Result<OrderView, DomainError> {
        self.repo.recalculate_totals(id)
    }
}

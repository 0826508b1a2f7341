use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::cart::CartView;
use super::catalog::{NewProduct, ProductView};
use super::coupon::{CouponTerms, NewCoupon};
use super::errors::DomainError;
use super::order::{OrderListResult, OrderStatus, OrderView};
use super::payment::{PaymentEvent, PaymentMethod, PaymentView};

pub trait CatalogRepository: Send + Sync + 'static {
    fn create(&self, product: NewProduct) -> Result<ProductView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<ProductView>, DomainError>;
    /// Units a new cart or checkout could still claim right now.
    fn available_stock(&self, id: Uuid) -> Result<i32, DomainError>;
    fn set_stock(&self, id: Uuid, stock: i32) -> Result<(), DomainError>;
}

pub trait CouponRepository: Send + Sync + 'static {
    fn create(&self, coupon: NewCoupon) -> Result<CouponTerms, DomainError>;
    fn find_by_code(&self, code: &str) -> Result<Option<CouponTerms>, DomainError>;
    fn set_active(&self, code: &str, active: bool) -> Result<(), DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    fn get_or_create(&self, user_id: Uuid) -> Result<CartView, DomainError>;
    fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError>;
    fn update_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError>;
    fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView, DomainError>;
    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Turn the user's cart into a PENDING order atomically, reserving stock
    /// and redeeming the coupon in the same transaction.
    fn checkout(
        &self,
        user_id: Uuid,
        shipping_address_id: Uuid,
        coupon_code: Option<&str>,
        shipping: BigDecimal,
    ) -> Result<OrderView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<OrderListResult, DomainError>;
    fn cancel(&self, id: Uuid) -> Result<OrderView, DomainError>;
    fn update_status(&self, id: Uuid, next: OrderStatus) -> Result<OrderView, DomainError>;
    fn recalculate_totals(&self, id: Uuid) -> Result<OrderView, DomainError>;
}

pub trait PaymentRepository: Send + Sync + 'static {
    fn initiate(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
        amount: BigDecimal,
    ) -> Result<PaymentView, DomainError>;
    fn record_event(&self, order_id: Uuid, event: PaymentEvent) -> Result<PaymentView, DomainError>;
}

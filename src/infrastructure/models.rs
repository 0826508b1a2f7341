use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::catalog::ProductView;
use crate::domain::coupon::{CouponRule, CouponTerms};
use crate::domain::errors::DomainError;
use crate::domain::order::OrderStatus;
use crate::domain::payment::{PaymentMethod, PaymentStatus, PaymentView};
use crate::schema::{cart_items, carts, coupons, order_items, orders, payments, products};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount_price: Option<BigDecimal>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn into_view(self) -> ProductView {
        ProductView {
            id: self.id,
            name: self.name,
            price: self.price,
            discount_price: self.discount_price,
            stock: self.stock,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount_price: Option<BigDecimal>,
    pub stock: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = carts)]
pub struct NewCartRow {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = cart_items)]
#[diesel(belongs_to(CartRow, foreign_key = cart_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_time: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_time: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CouponRow {
    pub id: Uuid,
    pub code: String,
    pub discount_value: BigDecimal,
    pub discount_percentage: i32,
    pub max_uses: i32,
    pub current_uses: i32,
    pub valid_until: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl CouponRow {
    pub fn into_terms(self) -> CouponTerms {
        CouponTerms {
            id: self.id,
            code: self.code,
            rule: CouponRule::from_columns(&self.discount_value, self.discount_percentage),
            max_uses: self.max_uses,
            current_uses: self.current_uses,
            valid_until: self.valid_until,
            active: self.active,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = coupons)]
pub struct NewCouponRow {
    pub id: Uuid,
    pub code: String,
    pub discount_value: BigDecimal,
    pub discount_percentage: i32,
    pub max_uses: i32,
    pub valid_until: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub shipping: BigDecimal,
    pub coupon_id: Option<Uuid>,
    pub shipping_address_id: Uuid,
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    /// Stored statuses are written exclusively through `OrderStatus::as_str`,
    /// so failing to parse one back means the row has been corrupted.
    pub fn parsed_status(&self) -> Result<OrderStatus, DomainError> {
        OrderStatus::parse(&self.status).ok_or_else(|| {
            DomainError::Internal(format!("unknown order status '{}' in storage", self.status))
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub shipping: BigDecimal,
    pub coupon_id: Option<Uuid>,
    pub shipping_address_id: Uuid,
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub amount: BigDecimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRow {
    pub fn parsed_status(&self) -> Result<PaymentStatus, DomainError> {
        PaymentStatus::parse(&self.status).ok_or_else(|| {
            DomainError::Internal(format!("unknown payment status '{}' in storage", self.status))
        })
    }

    pub fn into_view(self) -> Result<PaymentView, DomainError> {
        let status = self.parsed_status()?;
        let method = PaymentMethod::parse(&self.method).ok_or_else(|| {
            DomainError::Internal(format!("unknown payment method '{}' in storage", self.method))
        })?;
        Ok(PaymentView {
            id: self.id,
            order_id: self.order_id,
            method,
            status,
            transaction_id: self.transaction_id,
            amount: self.amount,
            paid_at: self.paid_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: String,
    pub status: String,
    pub amount: BigDecimal,
}

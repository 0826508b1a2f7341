use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::{DomainError, StockShortage};
use crate::domain::order::{OrderItemView, OrderListResult, OrderStatus, OrderView};
use crate::domain::ports::OrderRepository;
use crate::domain::pricing;
use crate::schema::{cart_items, carts, coupons, order_items, orders, payments, products};

use super::models::{
    CartItemRow, CartRow, CouponRow, NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow,
    PaymentRow, ProductRow,
};

pub struct DieselOrderRepository {
    pool: DbPool,
    lock_timeout_ms: u64,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }
}

/// Cap lock waits for the current transaction. A checkout queueing behind a
/// long-running competitor then fails with a retryable error instead of
/// holding a worker indefinitely.
pub(crate) fn set_lock_timeout(conn: &mut PgConnection, timeout_ms: u64) -> Result<(), DomainError> {
    sql_query(format!("SET LOCAL lock_timeout = '{}ms'", timeout_ms)).execute(conn)?;
    Ok(())
}

fn lock_order(conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderRow>, DomainError> {
    let order = orders::table
        .filter(orders::id.eq(id))
        .select(OrderRow::as_select())
        .for_update()
        .first(conn)
        .optional()?;
    Ok(order)
}

/// Give every order item's quantity back to its product. Items are walked in
/// product-id order, the same order checkout locks in, so the two paths can
/// never deadlock against each other.
pub(crate) fn restore_order_stock(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> Result<(), DomainError> {
    let items: Vec<OrderItemRow> = order_items::table
        .filter(order_items::order_id.eq(order_id))
        .order(order_items::product_id.asc())
        .select(OrderItemRow::as_select())
        .load(conn)?;

    for item in &items {
        diesel::update(products::table.filter(products::id.eq(item.product_id)))
            .set(products::stock.eq(products::stock + item.quantity))
            .execute(conn)?;
    }
    Ok(())
}

fn load_order_view(conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderView>, DomainError> {
    let order: Option<OrderRow> = orders::table
        .filter(orders::id.eq(id))
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?;
    let Some(order) = order else {
        return Ok(None);
    };
    let status = order.parsed_status()?;

    let items: Vec<OrderItemRow> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .order(order_items::product_id.asc())
        .select(OrderItemRow::as_select())
        .load(conn)?;

    let coupon_code = match order.coupon_id {
        Some(coupon_id) => coupons::table
            .filter(coupons::id.eq(coupon_id))
            .select(coupons::code)
            .first::<String>(conn)
            .optional()?,
        None => None,
    };

    let payment = payments::table
        .filter(payments::order_id.eq(order.id))
        .select(PaymentRow::as_select())
        .first(conn)
        .optional()?
        .map(PaymentRow::into_view)
        .transpose()?;

    Ok(Some(OrderView {
        id: order.id,
        user_id: order.user_id,
        status,
        subtotal: order.subtotal,
        discount: order.discount,
        shipping: order.shipping,
        total: order.total,
        coupon_code,
        shipping_address_id: order.shipping_address_id,
        created_at: order.created_at,
        items: items
            .into_iter()
            .map(|item| OrderItemView {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
        payment,
    }))
}

impl OrderRepository for DieselOrderRepository {
    fn checkout(
        &self,
        user_id: Uuid,
        shipping_address_id: Uuid,
        coupon_code: Option<&str>,
        shipping: BigDecimal,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;
        let lock_timeout_ms = self.lock_timeout_ms;

        conn.transaction::<_, DomainError, _>(|conn| {
            set_lock_timeout(conn, lock_timeout_ms)?;

            // 1. Load the cart and its items. A user without a cart checks
            //    out like one with an empty cart.
            let cart: Option<CartRow> = carts::table
                .filter(carts::user_id.eq(user_id))
                .select(CartRow::as_select())
                .first(conn)
                .optional()?;
            let Some(cart) = cart else {
                return Err(DomainError::EmptyCart);
            };
            let items: Vec<CartItemRow> = cart_items::table
                .filter(cart_items::cart_id.eq(cart.id))
                .order(cart_items::product_id.asc())
                .select(CartItemRow::as_select())
                .load(conn)?;
            if items.is_empty() {
                return Err(DomainError::EmptyCart);
            }

            // 2. Lock the product rows in id order (every writer locks in
            //    this order, which rules out lock cycles) and re-check stock
            //    under the lock. The add-to-cart check was only advisory.
            let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
            let locked: Vec<ProductRow> = products::table
                .filter(products::id.eq_any(&product_ids))
                .order(products::id.asc())
                .select(ProductRow::as_select())
                .for_update()
                .load(conn)?;
            if locked.len() != items.len() {
                return Err(DomainError::NotFound("product"));
            }
            let products_by_id: HashMap<Uuid, &ProductRow> =
                locked.iter().map(|p| (p.id, p)).collect();
            let paired: Vec<(&CartItemRow, &ProductRow)> = items
                .iter()
                .map(|item| {
                    products_by_id
                        .get(&item.product_id)
                        .map(|product| (item, *product))
                        .ok_or_else(|| {
                            DomainError::Internal("locked product row missing".to_string())
                        })
                })
                .collect::<Result<_, _>>()?;

            let shortages: Vec<StockShortage> = paired
                .iter()
                .filter(|(item, product)| item.quantity > product.stock)
                .map(|(item, product)| StockShortage {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: product.stock,
                })
                .collect();
            if !shortages.is_empty() {
                return Err(DomainError::InsufficientStock { shortages });
            }

            // 3. Snapshot unit prices from the current effective price. The
            //    cart's stored snapshot may be stale and is display-only.
            let mut subtotal = BigDecimal::from(0);
            let mut snapshots: Vec<(&CartItemRow, BigDecimal)> = Vec::with_capacity(paired.len());
            for (item, product) in paired.iter().copied() {
                let unit_price =
                    pricing::effective_price(&product.price, product.discount_price.as_ref());
                subtotal += pricing::line_total(&unit_price, item.quantity);
                snapshots.push((item, unit_price));
            }
            let subtotal = pricing::round_money(&subtotal);

            // 4. Validate and redeem the coupon under its row lock, so two
            //    concurrent checkouts cannot both take the last use.
            let (coupon_id, applied_code, discount) = match coupon_code {
                Some(code) => {
                    let row: Option<CouponRow> = coupons::table
                        .filter(coupons::code.eq(code))
                        .select(CouponRow::as_select())
                        .for_update()
                        .first(conn)
                        .optional()?;
                    let Some(row) = row else {
                        return Err(DomainError::CouponNotFound);
                    };
                    let terms = row.into_terms();
                    terms.check_redeemable(Utc::now())?;
                    diesel::update(coupons::table.filter(coupons::id.eq(terms.id)))
                        .set(coupons::current_uses.eq(coupons::current_uses + 1))
                        .execute(conn)?;
                    let discount = terms.rule.discount_for(&subtotal);
                    (Some(terms.id), Some(terms.code), discount)
                }
                None => (None, None, pricing::zero_money()),
            };

            // 5. Totals, clamped so a flat coupon can never push below zero.
            let shipping = pricing::round_money(&shipping);
            let total = pricing::order_total(&subtotal, &shipping, &discount);

            // 6. Insert the order and its items.
            let order_id = Uuid::new_v4();
            let created_at: DateTime<Utc> = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    user_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    shipping: shipping.clone(),
                    coupon_id,
                    shipping_address_id,
                    subtotal: subtotal.clone(),
                    discount: discount.clone(),
                    total: total.clone(),
                })
                .returning(orders::created_at)
                .get_result(conn)?;

            let new_items: Vec<NewOrderItemRow> = snapshots
                .iter()
                .map(|(item, unit_price)| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            // 7. Decrement stock. The table's CHECK constraint backs up the
            //    re-check in step 2.
            for (item, _) in &snapshots {
                diesel::update(products::table.filter(products::id.eq(item.product_id)))
                    .set(products::stock.eq(products::stock - item.quantity))
                    .execute(conn)?;
            }

            // 8. Clear the cart.
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;

            Ok(OrderView {
                id: order_id,
                user_id,
                status: OrderStatus::Pending,
                subtotal,
                discount,
                shipping,
                total,
                coupon_code: applied_code,
                shipping_address_id,
                created_at,
                items: new_items
                    .into_iter()
                    .map(|item| OrderItemView {
                        id: item.id,
                        product_id: item.product_id,
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                    })
                    .collect(),
                payment: None,
            })
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        load_order_view(&mut conn, id)
    }

    /// List rows carry totals and status only; items, payment, and coupon
    /// details are loaded through `find_by_id`.
    fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<OrderListResult, DomainError> {
        let mut conn = self.pool.get()?;
        let offset = (page - 1) * limit;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = match status {
                Some(s) => orders::table
                    .filter(orders::user_id.eq(user_id))
                    .filter(orders::status.eq(s.as_str()))
                    .count()
                    .get_result(conn)?,
                None => orders::table
                    .filter(orders::user_id.eq(user_id))
                    .count()
                    .get_result(conn)?,
            };

            let mut query = orders::table
                .filter(orders::user_id.eq(user_id))
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .into_boxed();
            if let Some(s) = status {
                query = query.filter(orders::status.eq(s.as_str()));
            }
            let rows = query.load::<OrderRow>(conn)?;

            let items = rows
                .into_iter()
                .map(|row| {
                    let status = row.parsed_status()?;
                    Ok(OrderView {
                        id: row.id,
                        user_id: row.user_id,
                        status,
                        subtotal: row.subtotal,
                        discount: row.discount,
                        shipping: row.shipping,
                        total: row.total,
                        coupon_code: None,
                        shipping_address_id: row.shipping_address_id,
                        created_at: row.created_at,
                        items: vec![],
                        payment: None,
                    })
                })
                .collect::<Result<Vec<_>, DomainError>>()?;

            Ok(OrderListResult { items, total })
        })
    }

    fn cancel(&self, id: Uuid) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;
        let lock_timeout_ms = self.lock_timeout_ms;

        conn.transaction::<_, DomainError, _>(|conn| {
            set_lock_timeout(conn, lock_timeout_ms)?;

            let order = lock_order(conn, id)?.ok_or(DomainError::NotFound("order"))?;
            let status = order.parsed_status()?;

            // Cancelling twice is a no-op, not an error.
            if status == OrderStatus::Canceled {
                return load_order_view(conn, id)?.ok_or(DomainError::NotFound("order"));
            }
            if !status.can_cancel() {
                return Err(DomainError::InvalidTransition {
                    from: status.to_string(),
                    to: OrderStatus::Canceled.to_string(),
                });
            }

            // The guard above makes the restoration exactly-once: only a
            // transition out of a live status reaches this point.
            restore_order_stock(conn, id)?;
            diesel::update(orders::table.filter(orders::id.eq(id)))
                .set(orders::status.eq(OrderStatus::Canceled.as_str()))
                .execute(conn)?;

            load_order_view(conn, id)?
                .ok_or_else(|| DomainError::Internal("canceled order vanished".to_string()))
        })
    }

    fn update_status(&self, id: Uuid, next: OrderStatus) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = lock_order(conn, id)?.ok_or(DomainError::NotFound("order"))?;
            let current = order.parsed_status()?;

            if !current.can_progress_to(next) {
                return Err(DomainError::InvalidTransition {
                    from: current.to_string(),
                    to: next.to_string(),
                });
            }

            diesel::update(orders::table.filter(orders::id.eq(id)))
                .set(orders::status.eq(next.as_str()))
                .execute(conn)?;

            load_order_view(conn, id)?
                .ok_or_else(|| DomainError::Internal("updated order vanished".to_string()))
        })
    }

    /// Recompute subtotal, discount, and total from the frozen item
    /// snapshots. Running it twice in a row changes nothing.
    fn recalculate_totals(&self, id: Uuid) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = lock_order(conn, id)?.ok_or(DomainError::NotFound("order"))?;

            let items: Vec<OrderItemRow> = order_items::table
                .filter(order_items::order_id.eq(order.id))
                .select(OrderItemRow::as_select())
                .load(conn)?;

            let mut subtotal = BigDecimal::from(0);
            for item in &items {
                subtotal += pricing::line_total(&item.unit_price, item.quantity);
            }
            let subtotal = pricing::round_money(&subtotal);

            let discount = match order.coupon_id {
                Some(coupon_id) => {
                    let row: CouponRow = coupons::table
                        .filter(coupons::id.eq(coupon_id))
                        .select(CouponRow::as_select())
                        .first(conn)?;
                    row.into_terms().rule.discount_for(&subtotal)
                }
                None => pricing::zero_money(),
            };
            let total = pricing::order_total(&subtotal, &order.shipping, &discount);

            diesel::update(orders::table.filter(orders::id.eq(id)))
                .set((
                    orders::subtotal.eq(subtotal),
                    orders::discount.eq(discount),
                    orders::total.eq(total),
                ))
                .execute(conn)?;

            load_order_view(conn, id)?
                .ok_or_else(|| DomainError::Internal("recalculated order vanished".to_string()))
        })
    }
}

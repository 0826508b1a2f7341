use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::OrderStatus;
use crate::domain::payment::{PaymentEvent, PaymentMethod, PaymentStatus, PaymentView};
use crate::domain::ports::PaymentRepository;
use crate::domain::pricing;
use crate::schema::{orders, payments};

use super::models::{NewPaymentRow, OrderRow, PaymentRow};
use super::order_repo::{restore_order_stock, set_lock_timeout};

pub struct DieselPaymentRepository {
    pool: DbPool,
    lock_timeout_ms: u64,
}

impl DieselPaymentRepository {
    pub fn new(pool: DbPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }
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

impl PaymentRepository for DieselPaymentRepository {
    /// Open a PENDING payment for an order. The order total is read under a
    /// row lock so the amount check cannot race a recalculation.
    fn initiate(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
        amount: BigDecimal,
    ) -> Result<PaymentView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = lock_order(conn, order_id)?.ok_or(DomainError::NotFound("order"))?;
            let status = order.parsed_status()?;
            if status.is_terminal() {
                return Err(DomainError::InvalidTransition {
                    from: status.to_string(),
                    to: OrderStatus::Paid.to_string(),
                });
            }

            let amount = pricing::round_money(&amount);
            if amount != order.total {
                return Err(DomainError::AmountMismatch {
                    expected: order.total.clone(),
                    actual: amount,
                });
            }

            let row: PaymentRow = diesel::insert_into(payments::table)
                .values(&NewPaymentRow {
                    id: Uuid::new_v4(),
                    order_id,
                    method: method.as_str().to_string(),
                    status: PaymentStatus::Pending.as_str().to_string(),
                    amount,
                })
                .returning(PaymentRow::as_returning())
                .get_result(conn)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(
                        DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => DomainError::Validation("payment already initiated for this order".into()),
                    other => other.into(),
                })?;

            row.into_view()
        })
    }

    /// Apply a gateway outcome to the payment and correlate it onto the
    /// order: PAID settles a PENDING order, FAILED leaves the order alone,
    /// REFUNDED cancels any order not already terminal and restores its
    /// stock. Payment status never moves backwards.
    fn record_event(&self, order_id: Uuid, event: PaymentEvent) -> Result<PaymentView, DomainError> {
        let mut conn = self.pool.get()?;
        let lock_timeout_ms = self.lock_timeout_ms;

        conn.transaction::<_, DomainError, _>(|conn| {
            set_lock_timeout(conn, lock_timeout_ms)?;

            let payment: PaymentRow = payments::table
                .filter(payments::order_id.eq(order_id))
                .select(PaymentRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound("payment"))?;
            let current = payment.parsed_status()?;
            let target = event.target_status();
            if !current.can_transition_to(target) {
                return Err(DomainError::InvalidTransition {
                    from: current.to_string(),
                    to: target.to_string(),
                });
            }

            match &event {
                PaymentEvent::Paid { transaction_id } => {
                    // Settlement only lands on an order still awaiting it.
                    let order =
                        lock_order(conn, order_id)?.ok_or(DomainError::NotFound("order"))?;
                    let order_status = order.parsed_status()?;
                    if order_status != OrderStatus::Pending {
                        return Err(DomainError::InvalidTransition {
                            from: order_status.to_string(),
                            to: OrderStatus::Paid.to_string(),
                        });
                    }

                    diesel::update(payments::table.filter(payments::id.eq(payment.id)))
                        .set((
                            payments::status.eq(PaymentStatus::Paid.as_str()),
                            payments::paid_at.eq(Utc::now()),
                            payments::transaction_id.eq(transaction_id.clone()),
                        ))
                        .execute(conn)?;
                    diesel::update(orders::table.filter(orders::id.eq(order_id)))
                        .set(orders::status.eq(OrderStatus::Paid.as_str()))
                        .execute(conn)?;
                }
                PaymentEvent::Failed => {
                    // The order stays PENDING; the user may cancel it or a
                    // fresh event may still settle the payment.
                    diesel::update(payments::table.filter(payments::id.eq(payment.id)))
                        .set(payments::status.eq(PaymentStatus::Failed.as_str()))
                        .execute(conn)?;
                }
                PaymentEvent::Refunded => {
                    diesel::update(payments::table.filter(payments::id.eq(payment.id)))
                        .set(payments::status.eq(PaymentStatus::Refunded.as_str()))
                        .execute(conn)?;

                    let order =
                        lock_order(conn, order_id)?.ok_or(DomainError::NotFound("order"))?;
                    let order_status = order.parsed_status()?;
                    // A delivered order keeps its goods; everything else is
                    // called off and its stock returned. The payment-status
                    // guard above makes this restoration exactly-once.
                    if !order_status.is_terminal() {
                        restore_order_stock(conn, order_id)?;
                        diesel::update(orders::table.filter(orders::id.eq(order_id)))
                            .set(orders::status.eq(OrderStatus::Canceled.as_str()))
                            .execute(conn)?;
                    }
                }
            }

            let updated: PaymentRow = payments::table
                .filter(payments::id.eq(payment.id))
                .select(PaymentRow::as_select())
                .first(conn)?;
            updated.into_view()
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::DieselPaymentRepository;
    use crate::db::DbPool;
    use crate::domain::errors::DomainError;
    use crate::domain::order::OrderStatus;
    use crate::domain::payment::{PaymentEvent, PaymentMethod, PaymentStatus};
    use crate::domain::ports::{CartRepository, CatalogRepository, OrderRepository, PaymentRepository};
    use crate::infrastructure::cart_repo::DieselCartRepository;
    use crate::infrastructure::catalog_repo::DieselCatalogRepository;
    use crate::infrastructure::order_repo::DieselOrderRepository;
    use crate::infrastructure::testutil::{dec, seed_product, setup_db};

    fn payment_repo(pool: &DbPool) -> DieselPaymentRepository {
        DieselPaymentRepository::new(pool.clone(), 5_000)
    }

    /// Seed a product, fill a cart, and check out. Returns (order id,
    /// product id); the order total is 129.90 (100.00 + 29.90 shipping).
    fn place_order(pool: &DbPool) -> (Uuid, Uuid) {
        let user_id = Uuid::new_v4();
        let product = seed_product(pool, "100.00", None, 5);
        DieselCartRepository::new(pool.clone())
            .add_item(user_id, product.id, 1)
            .expect("add to cart failed");
        let order = DieselOrderRepository::new(pool.clone(), 5_000)
            .checkout(user_id, Uuid::new_v4(), None, dec("29.90"))
            .expect("checkout failed");
        (order.id, product.id)
    }

    #[tokio::test]
    async fn initiate_requires_the_exact_order_total() {
        let (_container, pool) = setup_db().await;
        let repo = payment_repo(&pool);
        let (order_id, _) = place_order(&pool);

        let result = repo.initiate(order_id, PaymentMethod::Pix, dec("100.00"));
        match result {
            Err(DomainError::AmountMismatch { expected, actual }) => {
                assert_eq!(expected, dec("129.90"));
                assert_eq!(actual, dec("100.00"));
            }
            other => panic!("expected AmountMismatch, got {:?}", other.map(|p| p.id)),
        }

        let payment = repo
            .initiate(order_id, PaymentMethod::Pix, dec("129.90"))
            .expect("initiate failed");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, dec("129.90"));
        assert!(payment.paid_at.is_none());
    }

    #[tokio::test]
    async fn initiate_is_rejected_for_terminal_or_duplicate_payments() {
        let (_container, pool) = setup_db().await;
        let repo = payment_repo(&pool);
        let (order_id, _) = place_order(&pool);

        repo.initiate(order_id, PaymentMethod::CreditCard, dec("129.90"))
            .expect("initiate failed");
        assert!(matches!(
            repo.initiate(order_id, PaymentMethod::Pix, dec("129.90")),
            Err(DomainError::Validation(_))
        ));

        let (canceled_order, _) = place_order(&pool);
        DieselOrderRepository::new(pool.clone(), 5_000)
            .cancel(canceled_order)
            .expect("cancel failed");
        assert!(matches!(
            repo.initiate(canceled_order, PaymentMethod::Pix, dec("129.90")),
            Err(DomainError::InvalidTransition { .. })
        ));

        assert!(matches!(
            repo.initiate(Uuid::new_v4(), PaymentMethod::Pix, dec("129.90")),
            Err(DomainError::NotFound("order"))
        ));
    }

    #[tokio::test]
    async fn paid_event_settles_payment_and_order_together() {
        let (_container, pool) = setup_db().await;
        let repo = payment_repo(&pool);
        let (order_id, _) = place_order(&pool);
        repo.initiate(order_id, PaymentMethod::Pix, dec("129.90"))
            .expect("initiate failed");

        let payment = repo
            .record_event(
                order_id,
                PaymentEvent::Paid {
                    transaction_id: Some("tx-8841".to_string()),
                },
            )
            .expect("event failed");

        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.transaction_id.as_deref(), Some("tx-8841"));
        assert!(payment.paid_at.is_some());

        let order = DieselOrderRepository::new(pool.clone(), 5_000)
            .find_by_id(order_id)
            .expect("find failed")
            .expect("order should exist");
        assert_eq!(order.status, OrderStatus::Paid);
        let embedded = order.payment.expect("payment should be embedded");
        assert_eq!(embedded.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn paid_event_requires_an_initiated_payment_and_a_pending_order() {
        let (_container, pool) = setup_db().await;
        let repo = payment_repo(&pool);
        let (order_id, _) = place_order(&pool);

        // No payment row yet.
        assert!(matches!(
            repo.record_event(order_id, PaymentEvent::Paid { transaction_id: None }),
            Err(DomainError::NotFound("payment"))
        ));

        repo.initiate(order_id, PaymentMethod::Boleto, dec("129.90"))
            .expect("initiate failed");
        DieselOrderRepository::new(pool.clone(), 5_000)
            .cancel(order_id)
            .expect("cancel failed");

        // Settling a canceled order is rejected, and the rejection must
        // leave the payment untouched.
        assert!(matches!(
            repo.record_event(order_id, PaymentEvent::Paid { transaction_id: None }),
            Err(DomainError::InvalidTransition { .. })
        ));
        let order = DieselOrderRepository::new(pool.clone(), 5_000)
            .find_by_id(order_id)
            .expect("find failed")
            .expect("order should exist");
        let payment = order.payment.expect("payment should exist");
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn failed_event_leaves_the_order_pending() {
        let (_container, pool) = setup_db().await;
        let repo = payment_repo(&pool);
        let (order_id, product_id) = place_order(&pool);
        repo.initiate(order_id, PaymentMethod::DebitCard, dec("129.90"))
            .expect("initiate failed");

        let payment = repo
            .record_event(order_id, PaymentEvent::Failed)
            .expect("event failed");
        assert_eq!(payment.status, PaymentStatus::Failed);

        let order = DieselOrderRepository::new(pool.clone(), 5_000)
            .find_by_id(order_id)
            .expect("find failed")
            .expect("order should exist");
        assert_eq!(order.status, OrderStatus::Pending);

        // A failed payment keeps the reservation; stock stays decremented.
        let catalog = DieselCatalogRepository::new(pool.clone());
        assert_eq!(catalog.available_stock(product_id).expect("stock failed"), 4);

        // And a failed payment cannot settle afterwards.
        assert!(matches!(
            repo.record_event(order_id, PaymentEvent::Paid { transaction_id: None }),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn refund_cancels_the_order_and_restores_stock_once() {
        let (_container, pool) = setup_db().await;
        let repo = payment_repo(&pool);
        let (order_id, product_id) = place_order(&pool);
        repo.initiate(order_id, PaymentMethod::CreditCard, dec("129.90"))
            .expect("initiate failed");
        repo.record_event(order_id, PaymentEvent::Paid { transaction_id: None })
            .expect("paid event failed");

        let catalog = DieselCatalogRepository::new(pool.clone());
        assert_eq!(catalog.available_stock(product_id).expect("stock failed"), 4);

        let payment = repo
            .record_event(order_id, PaymentEvent::Refunded)
            .expect("refund failed");
        assert_eq!(payment.status, PaymentStatus::Refunded);

        let order = DieselOrderRepository::new(pool.clone(), 5_000)
            .find_by_id(order_id)
            .expect("find failed")
            .expect("order should exist");
        assert_eq!(order.status, OrderStatus::Canceled);
        assert_eq!(catalog.available_stock(product_id).expect("stock failed"), 5);

        // A duplicate refund is rejected and must not restore stock again.
        assert!(matches!(
            repo.record_event(order_id, PaymentEvent::Refunded),
            Err(DomainError::InvalidTransition { .. })
        ));
        assert_eq!(catalog.available_stock(product_id).expect("stock failed"), 5);
    }

    #[tokio::test]
    async fn refund_before_settlement_is_rejected() {
        let (_container, pool) = setup_db().await;
        let repo = payment_repo(&pool);
        let (order_id, _) = place_order(&pool);
        repo.initiate(order_id, PaymentMethod::Pix, dec("129.90"))
            .expect("initiate failed");

        assert!(matches!(
            repo.record_event(order_id, PaymentEvent::Refunded),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn refund_of_a_delivered_order_keeps_it_delivered() {
        let (_container, pool) = setup_db().await;
        let repo = payment_repo(&pool);
        let order_repo = DieselOrderRepository::new(pool.clone(), 5_000);
        let (order_id, product_id) = place_order(&pool);
        repo.initiate(order_id, PaymentMethod::Pix, dec("129.90"))
            .expect("initiate failed");
        repo.record_event(order_id, PaymentEvent::Paid { transaction_id: None })
            .expect("paid event failed");
        order_repo
            .update_status(order_id, OrderStatus::Processing)
            .expect("to processing failed");
        order_repo
            .update_status(order_id, OrderStatus::Shipped)
            .expect("to shipped failed");
        order_repo
            .update_status(order_id, OrderStatus::Delivered)
            .expect("to delivered failed");

        let payment = repo
            .record_event(order_id, PaymentEvent::Refunded)
            .expect("refund failed");
        assert_eq!(payment.status, PaymentStatus::Refunded);

        // The goods were handed over; the order stays delivered and the
        // stock stays claimed.
        let order = order_repo
            .find_by_id(order_id)
            .expect("find failed")
            .expect("order should exist");
        assert_eq!(order.status, OrderStatus::Delivered);
        let catalog = DieselCatalogRepository::new(pool.clone());
        assert_eq!(catalog.available_stock(product_id).expect("stock failed"), 4);
    }
}

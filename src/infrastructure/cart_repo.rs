use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{CartItemView, CartView};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::domain::pricing;
use crate::schema::{cart_items, carts, products};

use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow, ProductRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn find_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<CartRow>, DomainError> {
    let cart = carts::table
        .filter(carts::user_id.eq(user_id))
        .select(CartRow::as_select())
        .first(conn)
        .optional()?;
    Ok(cart)
}

/// Get-or-create keyed on the user. Two racing requests both hit the unique
/// index; the loser's insert is a no-op and the follow-up select sees the
/// winner's row.
fn ensure_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<CartRow, DomainError> {
    if let Some(cart) = find_cart(conn, user_id)? {
        return Ok(cart);
    }
    diesel::insert_into(carts::table)
        .values(&NewCartRow {
            id: Uuid::new_v4(),
            user_id,
        })
        .on_conflict(carts::user_id)
        .do_nothing()
        .execute(conn)?;
    let cart = carts::table
        .filter(carts::user_id.eq(user_id))
        .select(CartRow::as_select())
        .first(conn)?;
    Ok(cart)
}

fn load_view(conn: &mut PgConnection, cart: CartRow) -> Result<CartView, DomainError> {
    let rows: Vec<(CartItemRow, String)> = cart_items::table
        .inner_join(products::table)
        .filter(cart_items::cart_id.eq(cart.id))
        .order(cart_items::created_at.asc())
        .select((CartItemRow::as_select(), products::name))
        .load(conn)?;

    Ok(CartView {
        id: cart.id,
        user_id: cart.user_id,
        items: rows
            .into_iter()
            .map(|(item, product_name)| CartItemView {
                product_id: item.product_id,
                product_name,
                quantity: item.quantity,
                price_at_time: item.price_at_time,
            })
            .collect(),
    })
}

impl CartRepository for DieselCartRepository {
    fn get_or_create(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = ensure_cart(conn, user_id)?;
            load_view(conn, cart)
        })
    }

    /// Adds `quantity` units, merging with an existing line for the same
    /// product. The stock bound here is advisory: carts do not reserve stock,
    /// so the binding check happens again at checkout under a row lock.
    fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        if quantity < 1 {
            return Err(DomainError::Validation("quantity must be at least 1".into()));
        }
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = ensure_cart(conn, user_id)?;

            let product: ProductRow = products::table
                .filter(products::id.eq(product_id))
                .select(ProductRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound("product"))?;

            let existing: Option<i32> = cart_items::table
                .filter(cart_items::cart_id.eq(cart.id))
                .filter(cart_items::product_id.eq(product_id))
                .select(cart_items::quantity)
                .first(conn)
                .optional()?;

            let requested = existing
                .unwrap_or(0)
                .checked_add(quantity)
                .ok_or_else(|| DomainError::Validation("quantity too large".into()))?;
            if requested > product.stock {
                return Err(DomainError::OutOfStock {
                    product_id,
                    requested,
                    available: product.stock,
                });
            }

            // Re-adding a product refreshes the price snapshot to the current
            // effective price.
            let price = pricing::effective_price(&product.price, product.discount_price.as_ref());
            diesel::insert_into(cart_items::table)
                .values(&NewCartItemRow {
                    id: Uuid::new_v4(),
                    cart_id: cart.id,
                    product_id,
                    quantity,
                    price_at_time: price.clone(),
                })
                .on_conflict((cart_items::cart_id, cart_items::product_id))
                .do_update()
                .set((
                    cart_items::quantity.eq(cart_items::quantity + quantity),
                    cart_items::price_at_time.eq(price),
                ))
                .execute(conn)?;

            load_view(conn, cart)
        })
    }

    fn update_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        if quantity < 0 {
            return Err(DomainError::Validation(
                "quantity must not be negative".into(),
            ));
        }
        if quantity == 0 {
            return self.remove_item(user_id, product_id);
        }
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = find_cart(conn, user_id)?.ok_or(DomainError::NotFound("cart item"))?;

            let product: ProductRow = products::table
                .filter(products::id.eq(product_id))
                .select(ProductRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound("product"))?;

            if quantity > product.stock {
                return Err(DomainError::OutOfStock {
                    product_id,
                    requested: quantity,
                    available: product.stock,
                });
            }

            let updated = diesel::update(
                cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .filter(cart_items::product_id.eq(product_id)),
            )
            .set(cart_items::quantity.eq(quantity))
            .execute(conn)?;

            if updated == 0 {
                return Err(DomainError::NotFound("cart item"));
            }
            load_view(conn, cart)
        })
    }

    fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = find_cart(conn, user_id)?.ok_or(DomainError::NotFound("cart item"))?;

            let deleted = diesel::delete(
                cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .filter(cart_items::product_id.eq(product_id)),
            )
            .execute(conn)?;

            if deleted == 0 {
                return Err(DomainError::NotFound("cart item"));
            }
            load_view(conn, cart)
        })
    }

    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = ensure_cart(conn, user_id)?;
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;
            load_view(conn, cart)
        })
    }
}

#[cfg(test)]
mod tests {
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselCartRepository;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::CartRepository;
    use crate::infrastructure::testutil::{dec, seed_product, setup_db};
    use crate::schema::products;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool);
        let user_id = Uuid::new_v4();

        let first = repo.get_or_create(user_id).expect("get failed");
        let second = repo.get_or_create(user_id).expect("get failed");

        assert_eq!(first.id, second.id);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn add_item_snapshots_the_effective_price() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let product = seed_product(&pool, "2999.99", Some("2499.99"), 10);

        let cart = repo.add_item(user_id, product.id, 2).expect("add failed");

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.items[0].price_at_time, dec("2499.99"));
        assert_eq!(cart.subtotal(), dec("4999.98"));
    }

    #[tokio::test]
    async fn re_adding_merges_quantity_and_refreshes_snapshot() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let product = seed_product(&pool, "100.00", None, 10);

        repo.add_item(user_id, product.id, 2).expect("add failed");

        // Price drops after the first add.
        let mut conn = pool.get().expect("conn failed");
        diesel::update(products::table.filter(products::id.eq(product.id)))
            .set(products::discount_price.eq(dec("80.00")))
            .execute(&mut conn)
            .expect("price update failed");

        let cart = repo.add_item(user_id, product.id, 1).expect("add failed");

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.items[0].price_at_time, dec("80.00"));
    }

    #[tokio::test]
    async fn add_item_enforces_the_advisory_stock_bound() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let product = seed_product(&pool, "10.00", None, 5);

        repo.add_item(user_id, product.id, 3).expect("add failed");
        let result = repo.add_item(user_id, product.id, 3);

        match result {
            Err(DomainError::OutOfStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 6);
                assert_eq!(available, 5);
            }
            other => panic!("expected OutOfStock, got {:?}", other.map(|c| c.items.len())),
        }

        // Two users may still hold more cart quantity than exists; carts do
        // not reserve stock.
        let other_user = Uuid::new_v4();
        repo.add_item(other_user, product.id, 4).expect("add failed");
    }

    #[tokio::test]
    async fn add_item_rejects_unknown_product_and_bad_quantity() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let product = seed_product(&pool, "10.00", None, 5);

        assert!(matches!(
            repo.add_item(user_id, Uuid::new_v4(), 1),
            Err(DomainError::NotFound("product"))
        ));
        assert!(matches!(
            repo.add_item(user_id, product.id, 0),
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_quantity_zero_removes_the_line() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let product = seed_product(&pool, "10.00", None, 5);

        repo.add_item(user_id, product.id, 2).expect("add failed");
        let cart = repo
            .update_quantity(user_id, product.id, 0)
            .expect("update failed");

        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn update_quantity_enforces_stock_and_existence() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let product = seed_product(&pool, "10.00", None, 5);

        repo.add_item(user_id, product.id, 2).expect("add failed");

        assert!(matches!(
            repo.update_quantity(user_id, product.id, 6),
            Err(DomainError::OutOfStock { .. })
        ));

        let cart = repo
            .update_quantity(user_id, product.id, 5)
            .expect("update failed");
        assert_eq!(cart.items[0].quantity, 5);

        let other_product = seed_product(&pool, "5.00", None, 5);
        assert!(matches!(
            repo.update_quantity(user_id, other_product.id, 1),
            Err(DomainError::NotFound("cart item"))
        ));
    }

    #[tokio::test]
    async fn remove_item_requires_an_existing_line() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let product = seed_product(&pool, "10.00", None, 5);

        repo.add_item(user_id, product.id, 1).expect("add failed");
        let cart = repo.remove_item(user_id, product.id).expect("remove failed");
        assert!(cart.is_empty());

        assert!(matches!(
            repo.remove_item(user_id, product.id),
            Err(DomainError::NotFound("cart item"))
        ));
    }

    #[tokio::test]
    async fn clear_empties_the_cart() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let user_id = Uuid::new_v4();
        let first = seed_product(&pool, "10.00", None, 5);
        let second = seed_product(&pool, "20.00", None, 5);

        repo.add_item(user_id, first.id, 1).expect("add failed");
        repo.add_item(user_id, second.id, 2).expect("add failed");

        let cart = repo.clear(user_id).expect("clear failed");
        assert!(cart.is_empty());

        // Clearing a cart that was never created just returns an empty cart.
        let fresh = repo.clear(Uuid::new_v4()).expect("clear failed");
        assert!(fresh.is_empty());
    }
}

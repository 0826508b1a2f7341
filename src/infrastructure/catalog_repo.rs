use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{NewProduct, ProductView};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::schema::products;

use super::models::{NewProductRow, ProductRow};

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn create(&self, product: NewProduct) -> Result<ProductView, DomainError> {
        product.validate()?;
        let mut conn = self.pool.get()?;

        let row: ProductRow = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: product.name,
                price: product.price,
                discount_price: product.discount_price,
                stock: product.stock,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;

        Ok(row.into_view())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = products::table
            .filter(products::id.eq(id))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(ProductRow::into_view))
    }

    fn available_stock(&self, id: Uuid) -> Result<i32, DomainError> {
        let mut conn = self.pool.get()?;

        // Checkout decrements `stock` in the same transaction that commits
        // the order, so the column already excludes every open reservation.
        // Cart-held quantities are deliberately not subtracted.
        let stock = products::table
            .filter(products::id.eq(id))
            .select(products::stock)
            .first::<i32>(&mut conn)
            .optional()?;

        stock.ok_or(DomainError::NotFound("product"))
    }

    fn set_stock(&self, id: Uuid, stock: i32) -> Result<(), DomainError> {
        if stock < 0 {
            return Err(DomainError::Validation("stock must not be negative".into()));
        }
        let mut conn = self.pool.get()?;

        let updated = diesel::update(products::table.filter(products::id.eq(id)))
            .set(products::stock.eq(stock))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(DomainError::NotFound("product"));
        }
        Ok(())
    }
}

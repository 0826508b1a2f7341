use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::coupon::{CouponTerms, NewCoupon};
use crate::domain::errors::DomainError;
use crate::domain::ports::CouponRepository;
use crate::schema::coupons;

use super::models::{CouponRow, NewCouponRow};

pub struct DieselCouponRepository {
    pool: DbPool,
}

impl DieselCouponRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CouponRepository for DieselCouponRepository {
    fn create(&self, coupon: NewCoupon) -> Result<CouponTerms, DomainError> {
        coupon.validate()?;
        let mut conn = self.pool.get()?;

        let row: CouponRow = diesel::insert_into(coupons::table)
            .values(&NewCouponRow {
                id: Uuid::new_v4(),
                code: coupon.code,
                discount_value: coupon.discount_value,
                discount_percentage: coupon.discount_percentage,
                max_uses: coupon.max_uses,
                valid_until: coupon.valid_until,
                active: coupon.active,
            })
            .returning(CouponRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    DomainError::Validation("coupon code already exists".to_string())
                }
                other => other.into(),
            })?;

        Ok(row.into_terms())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<CouponTerms>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = coupons::table
            .filter(coupons::code.eq(code))
            .select(CouponRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(CouponRow::into_terms))
    }

    fn set_active(&self, code: &str, active: bool) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(coupons::table.filter(coupons::code.eq(code)))
            .set(coupons::active.eq(active))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(DomainError::CouponNotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::DieselCouponRepository;
    use crate::domain::coupon::{CouponRule, NewCoupon};
    use crate::domain::errors::DomainError;
    use crate::domain::ports::CouponRepository;
    use crate::infrastructure::testutil::{dec, seed_coupon, setup_db};

    #[tokio::test]
    async fn create_and_find_by_code_roundtrip() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool);

        let created = repo
            .create(NewCoupon {
                code: "BLACKFRIDAY".to_string(),
                discount_value: dec("0.00"),
                discount_percentage: 30,
                max_uses: 100,
                valid_until: Utc::now() + Duration::days(30),
                active: true,
            })
            .expect("create failed");

        assert_eq!(created.rule, CouponRule::Percentage(30));
        assert_eq!(created.current_uses, 0);

        let found = repo
            .find_by_code("BLACKFRIDAY")
            .expect("find failed")
            .expect("coupon should exist");
        assert_eq!(found.id, created.id);
        assert!(found.check_redeemable(Utc::now()).is_ok());
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool.clone());
        seed_coupon(&pool, "FRETEGRATIS", "29.90", 0, 50);

        let result = repo.create(NewCoupon {
            code: "FRETEGRATIS".to_string(),
            discount_value: dec("10.00"),
            discount_percentage: 0,
            max_uses: 5,
            valid_until: Utc::now() + Duration::days(5),
            active: true,
        });

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn create_rejects_flat_and_percentage_together() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool);

        let result = repo.create(NewCoupon {
            code: "PROMO10".to_string(),
            discount_value: dec("10.00"),
            discount_percentage: 10,
            max_uses: 5,
            valid_until: Utc::now() + Duration::days(5),
            active: true,
        });

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn set_active_toggles_redeemability() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool.clone());
        seed_coupon(&pool, "PROMO10", "10.00", 0, 5);

        repo.set_active("PROMO10", false).expect("set_active failed");

        let coupon = repo
            .find_by_code("PROMO10")
            .expect("find failed")
            .expect("coupon should exist");
        assert!(matches!(
            coupon.check_redeemable(Utc::now()),
            Err(DomainError::CouponInactive)
        ));

        assert!(matches!(
            repo.set_active("MISSING", true),
            Err(DomainError::CouponNotFound)
        ));
    }
}

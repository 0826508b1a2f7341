use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::pricing;

/// How a coupon discounts a subtotal. A coupon is either a flat amount or a
/// percentage, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum CouponRule {
    Flat(BigDecimal),
    Percentage(i32),
}

impl CouponRule {
    /// Decode the two storage columns into a rule. A positive percentage wins
    /// over any stored flat value.
    pub fn from_columns(discount_value: &BigDecimal, discount_percentage: i32) -> Self {
        if discount_percentage > 0 {
            CouponRule::Percentage(discount_percentage)
        } else {
            CouponRule::Flat(discount_value.clone())
        }
    }

    /// Discount granted against `subtotal`. Flat discounts are capped at the
    /// subtotal so the discount can never exceed what is being discounted.
    pub fn discount_for(&self, subtotal: &BigDecimal) -> BigDecimal {
        match self {
            CouponRule::Flat(value) => {
                if value > subtotal {
                    pricing::round_money(subtotal)
                } else {
                    pricing::round_money(value)
                }
            }
            CouponRule::Percentage(pct) => {
                let raw = subtotal * BigDecimal::from(*pct) / BigDecimal::from(100);
                pricing::round_money(&raw)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CouponTerms {
    pub id: Uuid,
    pub code: String,
    pub rule: CouponRule,
    pub max_uses: i32,
    pub current_uses: i32,
    pub valid_until: DateTime<Utc>,
    pub active: bool,
}

impl CouponTerms {
    /// Redemption gates, checked in order: active flag, expiry, usage limit.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.active {
            return Err(DomainError::CouponInactive);
        }
        if now > self.valid_until {
            return Err(DomainError::CouponExpired);
        }
        if self.current_uses >= self.max_uses {
            return Err(DomainError::CouponExhausted);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub discount_value: BigDecimal,
    pub discount_percentage: i32,
    pub max_uses: i32,
    pub valid_until: DateTime<Utc>,
    pub active: bool,
}

impl NewCoupon {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.code.trim().is_empty() {
            return Err(DomainError::Validation("code must not be empty".into()));
        }
        let has_value = self.discount_value > BigDecimal::zero();
        let has_percentage = self.discount_percentage > 0;
        if has_value == has_percentage {
            return Err(DomainError::Validation(
                "exactly one of discount_value and discount_percentage must be set".into(),
            ));
        }
        if self.discount_percentage < 0 || self.discount_percentage > 100 {
            return Err(DomainError::Validation(
                "discount_percentage must be between 0 and 100".into(),
            ));
        }
        if self.discount_value < BigDecimal::zero() {
            return Err(DomainError::Validation(
                "discount_value must not be negative".into(),
            ));
        }
        if self.max_uses < 1 {
            return Err(DomainError::Validation("max_uses must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Duration;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn terms(rule: CouponRule) -> CouponTerms {
        CouponTerms {
            id: Uuid::new_v4(),
            code: "BLACKFRIDAY".to_string(),
            rule,
            max_uses: 100,
            current_uses: 0,
            valid_until: Utc::now() + Duration::days(30),
            active: true,
        }
    }

    #[test]
    fn percentage_discount_on_subtotal() {
        let rule = CouponRule::Percentage(30);
        assert_eq!(rule.discount_for(&dec("1000.00")), dec("300.00"));
    }

    #[test]
    fn percentage_discount_rounds_half_up() {
        let rule = CouponRule::Percentage(15);
        // 15% of 33.33 is 4.9995.
        assert_eq!(rule.discount_for(&dec("33.33")), dec("5.00"));
    }

    #[test]
    fn flat_discount_is_capped_at_subtotal() {
        let rule = CouponRule::Flat(dec("50.00"));
        assert_eq!(rule.discount_for(&dec("30.00")), dec("30.00"));
        assert_eq!(rule.discount_for(&dec("80.00")), dec("50.00"));
    }

    #[test]
    fn percentage_takes_precedence_over_flat_value() {
        let rule = CouponRule::from_columns(&dec("10.00"), 30);
        assert_eq!(rule, CouponRule::Percentage(30));

        let rule = CouponRule::from_columns(&dec("10.00"), 0);
        assert_eq!(rule, CouponRule::Flat(dec("10.00")));
    }

    #[test]
    fn check_redeemable_rejects_inactive() {
        let mut coupon = terms(CouponRule::Percentage(10));
        coupon.active = false;
        assert!(matches!(
            coupon.check_redeemable(Utc::now()),
            Err(DomainError::CouponInactive)
        ));
    }

    #[test]
    fn check_redeemable_rejects_expired() {
        let mut coupon = terms(CouponRule::Percentage(10));
        coupon.valid_until = Utc::now() - Duration::days(1);
        assert!(matches!(
            coupon.check_redeemable(Utc::now()),
            Err(DomainError::CouponExpired)
        ));
    }

    #[test]
    fn check_redeemable_rejects_exhausted() {
        let mut coupon = terms(CouponRule::Percentage(10));
        coupon.current_uses = coupon.max_uses;
        assert!(matches!(
            coupon.check_redeemable(Utc::now()),
            Err(DomainError::CouponExhausted)
        ));
    }

    #[test]
    fn check_redeemable_accepts_valid_coupon() {
        let coupon = terms(CouponRule::Flat(dec("29.90")));
        assert!(coupon.check_redeemable(Utc::now()).is_ok());
    }

    #[test]
    fn validate_requires_exactly_one_rule() {
        let both = NewCoupon {
            code: "PROMO".to_string(),
            discount_value: dec("10.00"),
            discount_percentage: 10,
            max_uses: 5,
            valid_until: Utc::now() + Duration::days(1),
            active: true,
        };
        assert!(both.validate().is_err());

        let neither = NewCoupon {
            discount_value: dec("0.00"),
            discount_percentage: 0,
            ..both
        };
        assert!(neither.validate().is_err());
    }
}

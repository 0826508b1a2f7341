use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::pricing;

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: BigDecimal,
    pub discount_price: Option<BigDecimal>,
    pub stock: i32,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation("name must not be empty".into()));
        }
        if self.price < BigDecimal::zero() {
            return Err(DomainError::Validation("price must not be negative".into()));
        }
        if let Some(discounted) = &self.discount_price {
            if discounted < &BigDecimal::zero() {
                return Err(DomainError::Validation(
                    "discount_price must not be negative".into(),
                ));
            }
            if discounted >= &self.price {
                return Err(DomainError::Validation(
                    "discount_price must be below price".into(),
                ));
            }
        }
        if self.stock < 0 {
            return Err(DomainError::Validation("stock must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount_price: Option<BigDecimal>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl ProductView {
    pub fn effective_price(&self) -> BigDecimal {
        pricing::effective_price(&self.price, self.discount_price.as_ref())
    }

    pub fn has_discount(&self) -> bool {
        self.discount_price.is_some()
    }

    pub fn discount_percentage(&self) -> i32 {
        pricing::discount_percentage(&self.price, self.discount_price.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn product(price: &str, discount: Option<&str>) -> ProductView {
        ProductView {
            id: Uuid::new_v4(),
            name: "Notebook Gamer".to_string(),
            price: BigDecimal::from_str(price).expect("valid decimal"),
            discount_price: discount.map(|d| BigDecimal::from_str(d).expect("valid decimal")),
            stock: 10,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn effective_price_uses_discount_when_present() {
        let p = product("2999.99", Some("2499.99"));
        assert!(p.has_discount());
        assert_eq!(p.effective_price(), BigDecimal::from_str("2499.99").unwrap());
        assert_eq!(p.discount_percentage(), 17);
    }

    #[test]
    fn effective_price_falls_back_to_list_price() {
        let p = product("149.90", None);
        assert!(!p.has_discount());
        assert_eq!(p.effective_price(), BigDecimal::from_str("149.90").unwrap());
        assert_eq!(p.discount_percentage(), 0);
    }

    #[test]
    fn validate_rejects_discount_at_or_above_price() {
        let input = NewProduct {
            name: "Mouse".to_string(),
            price: BigDecimal::from_str("50.00").unwrap(),
            discount_price: Some(BigDecimal::from_str("50.00").unwrap()),
            stock: 1,
        };
        assert!(matches!(
            input.validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_negative_stock() {
        let input = NewProduct {
            name: "Mouse".to_string(),
            price: BigDecimal::from_str("50.00").unwrap(),
            discount_price: None,
            stock: -1,
        };
        assert!(matches!(
            input.validate(),
            Err(DomainError::Validation(_))
        ));
    }
}

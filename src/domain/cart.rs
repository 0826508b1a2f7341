use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::pricing;

#[derive(Debug, Clone)]
pub struct CartItemView {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Effective unit price captured when the item entered the cart. Display
    /// only; checkout re-reads the current price.
    pub price_at_time: BigDecimal,
}

impl CartItemView {
    pub fn line_total(&self) -> BigDecimal {
        pricing::line_total(&self.price_at_time, self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItemView>,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal(&self) -> BigDecimal {
        let sum = self
            .items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + item.line_total());
        pricing::round_money(&sum)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn item(price: &str, quantity: i32) -> CartItemView {
        CartItemView {
            product_id: Uuid::new_v4(),
            product_name: "Teclado Mecanico".to_string(),
            quantity,
            price_at_time: BigDecimal::from_str(price).expect("valid decimal"),
        }
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let cart = CartView {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            items: vec![item("100.00", 2), item("29.90", 1)],
        };
        assert_eq!(cart.subtotal(), BigDecimal::from_str("229.90").unwrap());
    }

    #[test]
    fn empty_cart_subtotal_is_zero() {
        let cart = CartView {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            items: vec![],
        };
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), BigDecimal::from_str("0.00").unwrap());
    }
}

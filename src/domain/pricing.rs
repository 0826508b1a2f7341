use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};

/// Round a decimal amount to 2 places, half-up. Every monetary value leaving
/// the domain goes through this so stored and reported amounts agree.
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

pub fn zero_money() -> BigDecimal {
    BigDecimal::zero().with_scale(2)
}

/// The price a unit actually sells for: the discount price when one is set
/// and actually lower than the list price, the list price otherwise.
pub fn effective_price(price: &BigDecimal, discount_price: Option<&BigDecimal>) -> BigDecimal {
    match discount_price {
        Some(discounted) if discounted < price => round_money(discounted),
        _ => round_money(price),
    }
}

/// Percentage saved against the list price, rounded half-up to a whole number.
/// Zero when there is no real discount or the list price is not positive.
pub fn discount_percentage(price: &BigDecimal, discount_price: Option<&BigDecimal>) -> i32 {
    let Some(discounted) = discount_price else {
        return 0;
    };
    if price <= &BigDecimal::zero() || discounted >= price {
        return 0;
    }
    let ratio = (price - discounted) / price * BigDecimal::from(100);
    ratio
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i32()
        .unwrap_or(0)
}

pub fn line_total(unit_price: &BigDecimal, quantity: i32) -> BigDecimal {
    round_money(&(unit_price * BigDecimal::from(quantity)))
}

/// Final order total: subtotal plus shipping minus discount, never below zero.
pub fn order_total(
    subtotal: &BigDecimal,
    shipping: &BigDecimal,
    discount: &BigDecimal,
) -> BigDecimal {
    let total = subtotal + shipping - discount;
    if total < BigDecimal::zero() {
        zero_money()
    } else {
        round_money(&total)
    }
}

use std::env;

use bigdecimal::BigDecimal;

/// Runtime configuration read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Flat shipping rate added to every order total.
    pub shipping_flat_rate: BigDecimal,
    /// Upper bound on how long a checkout waits for row locks before giving
    /// up with a retryable error.
    pub checkout_lock_timeout_ms: u64,
}

impl Settings {
    pub fn from_env() -> Self {
        let shipping_flat_rate = env::var("SHIPPING_FLAT_RATE")
            .unwrap_or_else(|_| "29.90".to_string())
            .parse::<BigDecimal>()
            .expect("SHIPPING_FLAT_RATE must be a valid decimal");
        let checkout_lock_timeout_ms = env::var("CHECKOUT_LOCK_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u64>()
            .expect("CHECKOUT_LOCK_TIMEOUT_MS must be a valid number");
        Self {
            shipping_flat_rate,
            checkout_lock_timeout_ms,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shipping_flat_rate: BigDecimal::new(2990.into(), 2),
            checkout_lock_timeout_ms: 5000,
        }
    }
}

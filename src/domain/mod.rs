pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod errors;
pub mod order;
pub mod payment;
pub mod ports;
pub mod pricing;

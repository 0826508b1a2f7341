pub mod cart;
pub mod orders;
pub mod payments;

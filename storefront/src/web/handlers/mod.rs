// storefront/src/web/handlers/mod.rs

pub mod admin;
pub mod cart;
pub mod orders;
pub mod payments;

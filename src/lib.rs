//! Tally
//!
//! Tally is a cart pricing and coupon engine written in Rust. It computes
//! order totals (subtotal, shipping, tax, discount) from a shopping cart,
//! validates and redeems discount coupons, and snapshots the result into
//! immutable orders with guarded status transitions.

pub mod cart;
pub mod config;
pub mod coupons;
pub mod discounts;
pub mod lines;
pub mod orders;
pub mod policy;
pub mod prelude;
pub mod pricing;

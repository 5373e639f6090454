//! Tally prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError},
    config::{ConfigError, load_coupons, load_policy},
    coupons::{
        AppliedCoupon, ConsumeError, Coupon, CouponKind, CouponOutcome, CouponRegistry,
        CouponRejection,
    },
    discounts::{DiscountError, discount_for},
    lines::CartLine,
    orders::{Order, OrderError, OrderStatus, PaymentStatus, place_order},
    policy::PricingPolicy,
    pricing::{PricingError, PricingResult, compute_totals},
};

//! Pricing

use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    discounts::{DiscountError, discount_for, percent_of_minor},
    policy::PricingPolicy,
};

/// Errors that can occur while computing order totals.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Errors bubbled up from cart subtotal calculation.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Errors bubbled up from discount calculation.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Derived pricing breakdown for a cart and its applied coupon.
///
/// Recomputed from the cart on every mutation and never stored independently
/// of the order it produces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricingResult<'a> {
    subtotal: Money<'a, Currency>,
    shipping: Money<'a, Currency>,
    tax: Money<'a, Currency>,
    discount: Money<'a, Currency>,
    total: Money<'a, Currency>,
}

impl<'a> PricingResult<'a> {
    /// Sum of line totals before shipping, tax, or discount.
    #[must_use]
    pub fn subtotal(&self) -> Money<'a, Currency> {
        self.subtotal
    }

    /// Shipping cost under the policy.
    #[must_use]
    pub fn shipping(&self) -> Money<'a, Currency> {
        self.shipping
    }

    /// Tax charged on the pre-discount subtotal.
    #[must_use]
    pub fn tax(&self) -> Money<'a, Currency> {
        self.tax
    }

    /// Discount granted by the applied coupon, if any.
    #[must_use]
    pub fn discount(&self) -> Money<'a, Currency> {
        self.discount
    }

    /// Final payable amount, never negative.
    #[must_use]
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }
}

/// Compute the full pricing breakdown for a cart under a policy.
///
/// `total = subtotal + shipping + tax − discount`. Tax is charged on the
/// pre-discount subtotal; the discount comes off after tax. That ordering
/// changes the effective tax paid on a discounted order and is preserved
/// deliberately, matching what the checkout actually charges.
///
/// The total is floored at zero, although the discount caps in
/// [`discount_for`] mean the floor should never trigger in practice.
///
/// # Errors
///
/// Returns a [`PricingError`] if the subtotal, tax, or discount cannot be
/// computed, or money arithmetic fails.
pub fn compute_totals<'a>(
    cart: &Cart<'a>,
    policy: &PricingPolicy<'a>,
) -> Result<PricingResult<'a>, PricingError> {
    let subtotal = cart.subtotal()?;
    let shipping = policy.shipping_for(&subtotal);

    let tax_minor = percent_of_minor(policy.tax_rate(), subtotal.to_minor_units())?;
    let tax = Money::from_minor(tax_minor, subtotal.currency());

    let discount = discount_for(&subtotal, cart.applied_coupon())?;

    let total = subtotal.add(shipping)?.add(tax)?.sub(discount)?;

    let total = if total.to_minor_units() < 0 {
        Money::from_minor(0, subtotal.currency())
    } else {
        total
    };

    Ok(PricingResult {
        subtotal,
        shipping,
        tax,
        discount,
        total,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use decimal_percentage::Percentage;
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::{
        coupons::{Coupon, CouponKind, CouponRegistry},
        lines::CartLine,
    };

    use super::*;

    fn cart() -> Result<Cart<'static>, CartError> {
        Cart::with_lines(
            [
                CartLine::new("sku-1", "Widget", Money::from_minor(3000, USD), 2),
                CartLine::new("sku-2", "Gadget", Money::from_minor(1500, USD), 1),
            ],
            USD,
        )
    }

    fn policy() -> PricingPolicy<'static> {
        PricingPolicy::new(Percentage::from(0.08), Money::from_minor(599, USD))
    }

    #[test]
    fn totals_without_coupon() -> TestResult {
        let cart = cart()?;

        let result = compute_totals(&cart, &policy())?;

        // 75.00 + 5.99 + 6.00 − 0
        assert_eq!(result.subtotal(), Money::from_minor(7500, USD));
        assert_eq!(result.shipping(), Money::from_minor(599, USD));
        assert_eq!(result.tax(), Money::from_minor(600, USD));
        assert_eq!(result.discount(), Money::from_minor(0, USD));
        assert_eq!(result.total(), Money::from_minor(8699, USD));

        Ok(())
    }

    #[test]
    fn discount_is_subtracted_after_tax() -> TestResult {
        let mut registry = CouponRegistry::new();
        registry.insert(Coupon::new(
            "TEN",
            "$10 off",
            CouponKind::Fixed(Money::from_minor(1000, USD)),
        ));

        let mut cart = cart()?;
        cart.apply_coupon("TEN", &registry, Utc::now())?;

        let result = compute_totals(&cart, &policy())?;

        // Tax stays 8% of the full 75.00 subtotal even though 10.00 comes off.
        assert_eq!(result.tax(), Money::from_minor(600, USD));
        assert_eq!(result.total(), Money::from_minor(7699, USD));

        Ok(())
    }

    #[test]
    fn threshold_policy_waives_shipping() -> TestResult {
        let cart = cart()?;
        let policy = policy().with_free_shipping_threshold(Money::from_minor(7500, USD));

        let result = compute_totals(&cart, &policy)?;

        assert_eq!(result.shipping(), Money::from_minor(0, USD));
        assert_eq!(result.total(), Money::from_minor(8100, USD));

        Ok(())
    }

    #[test]
    fn removing_coupon_restores_undiscounted_total() -> TestResult {
        let mut registry = CouponRegistry::new();
        registry.insert(Coupon::new(
            "TEN",
            "$10 off",
            CouponKind::Fixed(Money::from_minor(1000, USD)),
        ));

        let mut cart = cart()?;
        cart.apply_coupon("TEN", &registry, Utc::now())?;
        cart.remove_coupon();

        let result = compute_totals(&cart, &policy())?;

        assert_eq!(result.discount(), Money::from_minor(0, USD));
        assert_eq!(
            result.total(),
            result.subtotal().add(result.shipping())?.add(result.tax())?
        );

        Ok(())
    }

    #[test]
    fn empty_cart_totals_are_zero_except_shipping() -> TestResult {
        let cart = Cart::new(USD);

        let result = compute_totals(&cart, &policy())?;

        assert_eq!(result.subtotal(), Money::from_minor(0, USD));
        assert_eq!(result.tax(), Money::from_minor(0, USD));
        assert_eq!(result.total(), Money::from_minor(599, USD));

        Ok(())
    }
}

//! Pricing Policy

use decimal_percentage::Percentage;
use rusty_money::{Money, iso::Currency};

/// Shipping and tax configuration for one storefront surface.
///
/// Some surfaces waive shipping above a spend threshold while others charge a
/// flat fee unconditionally; both are expressed by setting or omitting
/// `free_shipping_threshold`.
#[derive(Clone, Debug, PartialEq)]
pub struct PricingPolicy<'a> {
    tax_rate: Percentage,
    flat_shipping: Money<'a, Currency>,
    free_shipping_threshold: Option<Money<'a, Currency>>,
}

impl<'a> PricingPolicy<'a> {
    /// Create a policy with a tax rate and an unconditional flat shipping fee.
    pub fn new(tax_rate: Percentage, flat_shipping: Money<'a, Currency>) -> Self {
        Self {
            tax_rate,
            flat_shipping,
            free_shipping_threshold: None,
        }
    }

    /// Waive shipping for subtotals at or above the given threshold.
    #[must_use]
    pub fn with_free_shipping_threshold(mut self, threshold: Money<'a, Currency>) -> Self {
        self.free_shipping_threshold = Some(threshold);
        self
    }

    /// Get the tax rate.
    #[must_use]
    pub fn tax_rate(&self) -> &Percentage {
        &self.tax_rate
    }

    /// Get the flat shipping fee.
    #[must_use]
    pub fn flat_shipping(&self) -> &Money<'a, Currency> {
        &self.flat_shipping
    }

    /// Get the free-shipping threshold, if any.
    #[must_use]
    pub fn free_shipping_threshold(&self) -> Option<&Money<'a, Currency>> {
        self.free_shipping_threshold.as_ref()
    }

    /// Shipping cost for the given subtotal: zero at or above the threshold
    /// (when one is set), the flat fee otherwise.
    #[must_use]
    pub fn shipping_for(&self, subtotal: &Money<'_, Currency>) -> Money<'a, Currency> {
        if let Some(threshold) = &self.free_shipping_threshold
            && subtotal.to_minor_units() >= threshold.to_minor_units()
        {
            return Money::from_minor(0, self.flat_shipping.currency());
        }

        self.flat_shipping
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;

    use super::*;

    fn policy() -> PricingPolicy<'static> {
        PricingPolicy::new(Percentage::from(0.08), Money::from_minor(599, USD))
    }

    #[test]
    fn shipping_is_flat_without_threshold() {
        let policy = policy();

        let shipping = policy.shipping_for(&Money::from_minor(100_000, USD));

        assert_eq!(shipping, Money::from_minor(599, USD));
    }

    #[test]
    fn shipping_is_free_at_threshold() {
        let policy = policy().with_free_shipping_threshold(Money::from_minor(10000, USD));

        let shipping = policy.shipping_for(&Money::from_minor(10000, USD));

        assert_eq!(shipping, Money::from_minor(0, USD));
    }

    #[test]
    fn shipping_is_charged_below_threshold() {
        let policy = policy().with_free_shipping_threshold(Money::from_minor(10000, USD));

        let shipping = policy.shipping_for(&Money::from_minor(9999, USD));

        assert_eq!(shipping, Money::from_minor(599, USD));
    }
}

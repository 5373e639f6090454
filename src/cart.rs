//! Cart

use chrono::{DateTime, Utc};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;
use tracing::debug;

use crate::{
    coupons::{AppliedCoupon, CouponOutcome, CouponRegistry},
    lines::CartLine,
};

/// Errors related to cart construction or totals.
#[derive(Debug, Error)]
pub enum CartError {
    /// A line's currency differs from the cart currency (index, line currency, cart currency).
    #[error("Line {0} has currency {1}, but cart has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// A line total does not fit in minor units.
    #[error("Line total for {0} overflows minor units")]
    LineTotalOverflow(String),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// An active cart session: ordered lines plus at most one applied coupon.
///
/// All mutations clamp to a safe state instead of rejecting; the only hard
/// errors are currency mismatches and money arithmetic failures.
#[derive(Debug)]
pub struct Cart<'a> {
    lines: Vec<CartLine<'a>>,
    currency: &'static Currency,
    applied: Option<AppliedCoupon<'a>>,
}

impl<'a> Cart<'a> {
    /// Create a new empty cart in the given currency.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            lines: Vec::new(),
            currency,
            applied: None,
        }
    }

    /// Create a new cart with the given lines.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if any line's currency differs from the cart currency.
    pub fn with_lines(
        lines: impl Into<Vec<CartLine<'a>>>,
        currency: &'static Currency,
    ) -> Result<Self, CartError> {
        let lines = lines.into();

        lines.iter().enumerate().try_for_each(|(i, line)| {
            let line_currency = line.unit_price().currency();

            if line_currency == currency {
                Ok(())
            } else {
                Err(CartError::CurrencyMismatch(
                    i,
                    line_currency.iso_alpha_code,
                    currency.iso_alpha_code,
                ))
            }
        })?;

        Ok(Cart {
            lines,
            currency,
            applied: None,
        })
    }

    /// Add a line to the cart.
    ///
    /// If a line with the same id already exists, the incoming quantity is
    /// added to it (clamped to the existing line's cap); otherwise the line is
    /// appended as-is.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if the line's currency differs from the cart currency.
    pub fn add_item(&mut self, line: CartLine<'a>) -> Result<(), CartError> {
        let line_currency = line.unit_price().currency();

        if line_currency != self.currency {
            return Err(CartError::CurrencyMismatch(
                self.lines.len(),
                line_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        if let Some(existing) = self.lines.iter_mut().find(|l| l.id() == line.id()) {
            existing.add_quantity(line.quantity());
        } else {
            self.lines.push(line);
        }

        Ok(())
    }

    /// Set the quantity of the line with the given id, clamped to
    /// `[1, max_quantity]`. A no-op if the line is absent.
    pub fn update_quantity(&mut self, id: &str, quantity: u32) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.id() == id) {
            line.set_quantity(quantity);
        }
    }

    /// Remove the line with the given id. A no-op if the line is absent.
    pub fn remove_item(&mut self, id: &str) {
        self.lines.retain(|line| line.id() != id);
    }

    /// Empty the cart and drop any applied coupon.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.applied = None;
    }

    /// Calculate the subtotal of the cart: Σ(unit price × quantity).
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if a line total overflows or money arithmetic fails.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, CartError> {
        self.lines
            .iter()
            .try_fold(Money::from_minor(0, self.currency), |acc, line| {
                Ok(acc.add(line_total(line)?)?)
            })
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity())).sum()
    }

    /// Validate a coupon code against the current cart state and, on success,
    /// store it as the applied coupon.
    ///
    /// At most one coupon is active at a time: a successful application
    /// silently replaces any previously applied coupon. Rejections are
    /// reported in the returned [`CouponOutcome`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` only if the subtotal needed for the minimum-order
    /// check cannot be computed.
    pub fn apply_coupon(
        &mut self,
        code: &str,
        registry: &CouponRegistry<'a>,
        now: DateTime<Utc>,
    ) -> Result<CouponOutcome<'a>, CartError> {
        let subtotal = self.subtotal()?;
        let outcome = registry.validate(code, &subtotal, now);

        if let CouponOutcome::Applied { coupon } = &outcome {
            debug!(code = coupon.code(), "coupon applied to cart");
            self.applied = Some(coupon.clone());
        }

        Ok(outcome)
    }

    /// Drop the applied coupon, if any. Idempotent.
    pub fn remove_coupon(&mut self) {
        self.applied = None;
    }

    /// Get the currently applied coupon, if any.
    #[must_use]
    pub fn applied_coupon(&self) -> Option<&AppliedCoupon<'a>> {
        self.applied.as_ref()
    }

    /// Get a line by id.
    #[must_use]
    pub fn get_line(&self, id: &str) -> Option<&CartLine<'a>> {
        self.lines.iter().find(|line| line.id() == id)
    }

    /// Iterate over the lines in the cart.
    pub fn iter(&self) -> impl Iterator<Item = &CartLine<'a>> {
        self.lines.iter()
    }

    /// Get the number of lines in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get the currency of the cart.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

/// Extended total for a single line: unit price × quantity.
fn line_total<'a>(line: &CartLine<'a>) -> Result<Money<'a, Currency>, CartError> {
    let minor = line
        .unit_price()
        .to_minor_units()
        .checked_mul(i64::from(line.quantity()))
        .ok_or_else(|| CartError::LineTotalOverflow(line.id().to_string()))?;

    Ok(Money::from_minor(minor, line.unit_price().currency()))
}

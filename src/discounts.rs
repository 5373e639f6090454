//! Discounts

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::coupons::{AppliedCoupon, CouponKind};

/// Errors specific to discount calculations.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// A fixed coupon amount is in a different currency than the cart.
    #[error("coupon currency {0} does not match cart currency {1}")]
    CurrencyMismatch(&'static str, &'static str),
}

/// Calculate the discount an applied coupon grants on the given subtotal.
///
/// Eligibility is re-derived here, not trusted from apply time: if the cart
/// has shrunk below the coupon's minimum order amount since the coupon was
/// applied, the discount is zero. The result is always in `[0, subtotal]`;
/// a fixed discount larger than the order is capped at the subtotal and a
/// percentage discount is additionally capped by the coupon's `max_discount`.
///
/// # Errors
///
/// Returns a [`DiscountError`] if a percentage calculation cannot be safely
/// represented in minor units, or if a fixed coupon amount is in a different
/// currency than the subtotal.
pub fn discount_for<'a>(
    subtotal: &Money<'a, Currency>,
    applied: Option<&AppliedCoupon<'a>>,
) -> Result<Money<'a, Currency>, DiscountError> {
    let currency = subtotal.currency();
    let zero = Money::from_minor(0, currency);

    let Some(coupon) = applied else {
        return Ok(zero);
    };

    let subtotal_minor = subtotal.to_minor_units();

    if let Some(min) = coupon.min_order_amount()
        && subtotal_minor < min.to_minor_units()
    {
        return Ok(zero);
    }

    let raw_minor = match coupon.kind() {
        CouponKind::Percentage(percent) => {
            let raw = percent_of_minor(percent, subtotal_minor)?;

            match coupon.max_discount() {
                Some(cap) => raw.min(cap.to_minor_units()),
                None => raw,
            }
        }
        CouponKind::Fixed(amount) => {
            if amount.currency() != currency {
                return Err(DiscountError::CurrencyMismatch(
                    amount.currency().iso_alpha_code,
                    currency.iso_alpha_code,
                ));
            }

            amount.to_minor_units()
        }
    };

    let minor = raw_minor.clamp(0, subtotal_minor.max(0));

    Ok(Money::from_minor(minor, currency))
}

/// Calculate a percentage of an amount in minor units.
///
/// # Errors
///
/// Returns an error if:
/// - The percentage calculation overflows or cannot be safely represented (`DiscountError::PercentConversion`).
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage doesn't expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}

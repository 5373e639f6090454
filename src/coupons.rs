//! Coupons
//!
//! Coupon records, the registry they live in, and the validation outcomes
//! produced when a shopper tries to apply one. Validation failures are
//! ordinary values ([`CouponRejection`]), not errors: the worst case is
//! "coupon inapplicable", which the shopper can always recover from.
//!
//! Eligibility is a function of the *current* cart state. Applying a coupon
//! stores a snapshot on the cart, but every pricing pass re-derives
//! eligibility from scratch; the snapshot is never trusted as a cached
//! decision.

use chrono::{DateTime, Utc};
use decimal_percentage::Percentage;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::debug;

/// Discount shape of a coupon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CouponKind<'a> {
    /// Take a fraction of the subtotal off (e.g., 10% off).
    Percentage(Percentage),

    /// Take a fixed amount off the subtotal (e.g., $20 off).
    Fixed(Money<'a, Currency>),
}

/// Why a coupon could not be applied.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CouponRejection {
    /// No code was entered.
    #[error("enter a coupon code")]
    EmptyCode,

    /// The code matches no coupon in the registry.
    #[error("invalid coupon code")]
    UnknownCode,

    /// The coupon has been switched off by an administrator.
    #[error("coupon is no longer active")]
    Inactive,

    /// The coupon's expiry timestamp has passed.
    #[error("coupon has expired")]
    Expired,

    /// The coupon has been redeemed as many times as its limit allows.
    #[error("coupon usage limit reached")]
    UsageLimitReached,

    /// The cart subtotal is below the coupon's minimum order amount.
    #[error("spend {shortfall} more to use this coupon")]
    BelowMinimumOrder {
        /// Amount still needed to reach the coupon's minimum order.
        shortfall: String,
    },
}

/// Result of attempting to apply a coupon code to a cart.
#[derive(Clone, Debug, PartialEq)]
pub enum CouponOutcome<'a> {
    /// The coupon was accepted and is now the cart's applied coupon.
    Applied {
        /// Snapshot of the accepted coupon.
        coupon: AppliedCoupon<'a>,
    },

    /// The coupon was rejected; the cart is unchanged.
    Rejected(CouponRejection),
}

impl CouponOutcome<'_> {
    /// Whether the coupon was accepted.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, CouponOutcome::Applied { .. })
    }

    /// Human-readable message for the shopper: the coupon description on
    /// success, the rejection reason otherwise.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            CouponOutcome::Applied { coupon } => coupon.description().to_string(),
            CouponOutcome::Rejected(rejection) => rejection.to_string(),
        }
    }

    /// The rejection reason, if the coupon was rejected.
    #[must_use]
    pub fn rejection(&self) -> Option<&CouponRejection> {
        match self {
            CouponOutcome::Applied { .. } => None,
            CouponOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}

/// A coupon record as configured by an administrator.
///
/// Codes are stored upper-cased and matched case-insensitively. `usage_count`
/// only ever increases through [`CouponRegistry::consume`]; resetting it is an
/// explicit admin edit via [`Coupon::set_usage_count`].
#[derive(Clone, Debug, PartialEq)]
pub struct Coupon<'a> {
    code: String,
    description: String,
    kind: CouponKind<'a>,
    min_order_amount: Option<Money<'a, Currency>>,
    max_discount: Option<Money<'a, Currency>>,
    usage_limit: Option<u32>,
    usage_count: u32,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl<'a> Coupon<'a> {
    /// Create a new active, unused coupon with no constraints.
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        kind: CouponKind<'a>,
    ) -> Self {
        Self {
            code: normalize_code(&code.into()),
            description: description.into(),
            kind,
            min_order_amount: None,
            max_discount: None,
            usage_limit: None,
            usage_count: 0,
            expires_at: None,
            is_active: true,
        }
    }

    /// Require a minimum order subtotal before the coupon applies.
    #[must_use]
    pub fn with_min_order_amount(mut self, min_order_amount: Money<'a, Currency>) -> Self {
        self.min_order_amount = Some(min_order_amount);
        self
    }

    /// Cap the discount a percentage coupon can grant.
    #[must_use]
    pub fn with_max_discount(mut self, max_discount: Money<'a, Currency>) -> Self {
        self.max_discount = Some(max_discount);
        self
    }

    /// Limit how many completed orders may redeem this coupon.
    #[must_use]
    pub fn with_usage_limit(mut self, usage_limit: u32) -> Self {
        self.usage_limit = Some(usage_limit);
        self
    }

    /// Set an expiry timestamp after which the coupon is rejected.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Switch the coupon on or off (admin edit).
    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }

    /// Overwrite the usage count (admin edit; the only way it decreases).
    pub fn set_usage_count(&mut self, usage_count: u32) {
        self.usage_count = usage_count;
    }

    /// Get the upper-cased coupon code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get the shopper-facing description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the discount shape.
    #[must_use]
    pub fn kind(&self) -> &CouponKind<'a> {
        &self.kind
    }

    /// Get the minimum order amount, if any.
    #[must_use]
    pub fn min_order_amount(&self) -> Option<&Money<'a, Currency>> {
        self.min_order_amount.as_ref()
    }

    /// Get the discount cap, if any.
    #[must_use]
    pub fn max_discount(&self) -> Option<&Money<'a, Currency>> {
        self.max_discount.as_ref()
    }

    /// Get the usage limit, if any.
    #[must_use]
    pub fn usage_limit(&self) -> Option<u32> {
        self.usage_limit
    }

    /// Get how many completed orders have redeemed this coupon.
    #[must_use]
    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    /// Get the expiry timestamp, if any.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the coupon is switched on.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Check whether this coupon may be applied to a cart with the given
    /// subtotal at the given instant.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`CouponRejection`], checked in order:
    /// active flag, expiry, usage limit, minimum order amount.
    pub fn check(
        &self,
        subtotal: &Money<'_, Currency>,
        now: DateTime<Utc>,
    ) -> Result<(), CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }

        if let Some(expires_at) = self.expires_at
            && expires_at < now
        {
            return Err(CouponRejection::Expired);
        }

        if let Some(limit) = self.usage_limit
            && self.usage_count >= limit
        {
            return Err(CouponRejection::UsageLimitReached);
        }

        if let Some(min) = &self.min_order_amount
            && subtotal.to_minor_units() < min.to_minor_units()
        {
            let shortfall = Money::from_minor(
                min.to_minor_units() - subtotal.to_minor_units(),
                min.currency(),
            );

            return Err(CouponRejection::BelowMinimumOrder {
                shortfall: shortfall.to_string(),
            });
        }

        Ok(())
    }

    /// Take the session snapshot stored on a cart when this coupon applies.
    #[must_use]
    pub fn snapshot(&self) -> AppliedCoupon<'a> {
        AppliedCoupon {
            code: self.code.clone(),
            description: self.description.clone(),
            kind: self.kind,
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
        }
    }
}

/// Session snapshot of an applied coupon.
///
/// Ephemeral: lives on the cart until the coupon is removed or the order
/// completes. Carries the fields pricing needs so discount calculation can
/// re-check the minimum order on every pass.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedCoupon<'a> {
    code: String,
    description: String,
    kind: CouponKind<'a>,
    min_order_amount: Option<Money<'a, Currency>>,
    max_discount: Option<Money<'a, Currency>>,
}

impl<'a> AppliedCoupon<'a> {
    /// Get the upper-cased coupon code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get the shopper-facing description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the discount shape.
    #[must_use]
    pub fn kind(&self) -> &CouponKind<'a> {
        &self.kind
    }

    /// Get the minimum order amount, if any.
    #[must_use]
    pub fn min_order_amount(&self) -> Option<&Money<'a, Currency>> {
        self.min_order_amount.as_ref()
    }

    /// Get the discount cap, if any.
    #[must_use]
    pub fn max_discount(&self) -> Option<&Money<'a, Currency>> {
        self.max_discount.as_ref()
    }
}

/// Errors from recording a coupon redemption.
#[derive(Debug, Error, PartialEq)]
pub enum ConsumeError {
    /// The code matches no coupon in the registry.
    #[error("no coupon with code {0}")]
    UnknownCode(String),

    /// The coupon is already at its usage limit.
    #[error("coupon {0} has reached its usage limit")]
    UsageLimitReached(String),
}

/// The set of coupons available to a storefront, keyed by upper-cased code.
///
/// The registry itself is plain data. When it is shared across concurrent
/// checkout sessions, the caller must serialize [`CouponRegistry::consume`]
/// calls (a lock or a database transaction); the conditional check inside
/// `consume` then bounds usage to the configured limit.
#[derive(Debug, Default)]
pub struct CouponRegistry<'a> {
    coupons: FxHashMap<String, Coupon<'a>>,
}

impl<'a> CouponRegistry<'a> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coupons: FxHashMap::default(),
        }
    }

    /// Insert a coupon, replacing any existing coupon with the same code.
    pub fn insert(&mut self, coupon: Coupon<'a>) {
        self.coupons.insert(coupon.code().to_string(), coupon);
    }

    /// Look up a coupon by code, case-insensitively.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Coupon<'a>> {
        self.coupons.get(&normalize_code(code))
    }

    /// Look up a coupon by code for an admin edit.
    pub fn get_mut(&mut self, code: &str) -> Option<&mut Coupon<'a>> {
        self.coupons.get_mut(&normalize_code(code))
    }

    /// Validate a code against a cart subtotal at the given instant.
    ///
    /// Returns [`CouponOutcome::Applied`] with a session snapshot on success;
    /// all failures come back as [`CouponOutcome::Rejected`].
    #[must_use]
    pub fn validate(
        &self,
        code: &str,
        subtotal: &Money<'_, Currency>,
        now: DateTime<Utc>,
    ) -> CouponOutcome<'a> {
        let normalized = normalize_code(code);

        if normalized.is_empty() {
            return CouponOutcome::Rejected(CouponRejection::EmptyCode);
        }

        let Some(coupon) = self.coupons.get(&normalized) else {
            debug!(code = %normalized, "unknown coupon code");
            return CouponOutcome::Rejected(CouponRejection::UnknownCode);
        };

        match coupon.check(subtotal, now) {
            Ok(()) => CouponOutcome::Applied {
                coupon: coupon.snapshot(),
            },
            Err(rejection) => {
                debug!(code = %normalized, %rejection, "coupon rejected");
                CouponOutcome::Rejected(rejection)
            }
        }
    }

    /// Record one redemption of the coupon, at order completion.
    ///
    /// The increment is conditional on `usage_count < usage_limit`, so a
    /// registry at its limit fails here instead of overshooting.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsumeError`] if the code is unknown or the coupon is
    /// already at its usage limit.
    pub fn consume(&mut self, code: &str) -> Result<(), ConsumeError> {
        let normalized = normalize_code(code);

        let coupon = self
            .coupons
            .get_mut(&normalized)
            .ok_or_else(|| ConsumeError::UnknownCode(normalized.clone()))?;

        if let Some(limit) = coupon.usage_limit
            && coupon.usage_count >= limit
        {
            return Err(ConsumeError::UsageLimitReached(normalized));
        }

        coupon.usage_count += 1;
        debug!(code = %normalized, usage_count = coupon.usage_count, "coupon consumed");

        Ok(())
    }

    /// Iterate over the coupons in the registry.
    pub fn iter(&self) -> impl Iterator<Item = &Coupon<'a>> {
        self.coupons.values()
    }

    /// Get the number of coupons in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}

/// Trim and upper-case a coupon code for storage and lookup.
fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    fn ten_percent() -> Coupon<'static> {
        Coupon::new(
            "welcome10",
            "10% off your first order",
            CouponKind::Percentage(Percentage::from(0.10)),
        )
    }

    #[test]
    fn codes_are_stored_upper_cased() {
        let coupon = ten_percent();

        assert_eq!(coupon.code(), "WELCOME10");
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let mut registry = CouponRegistry::new();
        registry.insert(ten_percent());

        assert!(registry.get("welcome10").is_some());
        assert!(registry.get("  Welcome10 ").is_some());
        assert!(registry.get("WELCOME10").is_some());
        assert!(registry.get("OTHER").is_none());
    }

    #[test]
    fn validate_rejects_empty_code() {
        let registry = CouponRegistry::new();
        let subtotal = Money::from_minor(1000, USD);

        let outcome = registry.validate("   ", &subtotal, Utc::now());

        assert_eq!(outcome.rejection(), Some(&CouponRejection::EmptyCode));
        assert_eq!(outcome.message(), "enter a coupon code");
    }

    #[test]
    fn validate_rejects_unknown_code() {
        let registry = CouponRegistry::new();
        let subtotal = Money::from_minor(1000, USD);

        let outcome = registry.validate("NOPE", &subtotal, Utc::now());

        assert_eq!(outcome.rejection(), Some(&CouponRejection::UnknownCode));
        assert_eq!(outcome.message(), "invalid coupon code");
    }

    #[test]
    fn validate_rejects_inactive_coupon() {
        let mut registry = CouponRegistry::new();
        let mut coupon = ten_percent();
        coupon.set_active(false);
        registry.insert(coupon);

        let subtotal = Money::from_minor(1000, USD);
        let outcome = registry.validate("WELCOME10", &subtotal, Utc::now());

        assert_eq!(outcome.rejection(), Some(&CouponRejection::Inactive));
    }

    #[test]
    fn validate_rejects_expired_coupon() {
        let now = Utc::now();

        let mut registry = CouponRegistry::new();
        registry.insert(ten_percent().with_expiry(now - Duration::hours(1)));

        let subtotal = Money::from_minor(1000, USD);
        let outcome = registry.validate("WELCOME10", &subtotal, now);

        assert_eq!(outcome.rejection(), Some(&CouponRejection::Expired));
    }

    #[test]
    fn coupon_expiring_exactly_now_is_still_valid() -> TestResult {
        let now = Utc::now();
        let coupon = ten_percent().with_expiry(now);

        coupon.check(&Money::from_minor(1000, USD), now)?;

        Ok(())
    }

    #[test]
    fn validate_rejects_exhausted_coupon_even_when_active_and_unexpired() {
        let mut coupon = ten_percent().with_usage_limit(3);
        coupon.set_usage_count(3);

        let mut registry = CouponRegistry::new();
        registry.insert(coupon);

        let subtotal = Money::from_minor(1000, USD);
        let outcome = registry.validate("WELCOME10", &subtotal, Utc::now());

        assert_eq!(
            outcome.rejection(),
            Some(&CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn validate_rejects_subtotal_below_minimum_with_shortfall() {
        let mut registry = CouponRegistry::new();
        registry.insert(ten_percent().with_min_order_amount(Money::from_minor(5000, USD)));

        let subtotal = Money::from_minor(4000, USD);
        let outcome = registry.validate("WELCOME10", &subtotal, Utc::now());

        match outcome.rejection() {
            Some(CouponRejection::BelowMinimumOrder { shortfall }) => {
                // $50.00 − $40.00
                assert_eq!(shortfall, &Money::from_minor(1000, USD).to_string());
            }
            other => panic!("expected BelowMinimumOrder, got {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_subtotal_meeting_minimum_exactly() {
        let mut registry = CouponRegistry::new();
        registry.insert(ten_percent().with_min_order_amount(Money::from_minor(5000, USD)));

        let subtotal = Money::from_minor(5000, USD);
        let outcome = registry.validate("WELCOME10", &subtotal, Utc::now());

        assert!(outcome.is_applied(), "minimum order is inclusive");
        assert_eq!(outcome.message(), "10% off your first order");
    }

    #[test]
    fn snapshot_carries_pricing_fields() {
        let coupon = ten_percent()
            .with_min_order_amount(Money::from_minor(5000, USD))
            .with_max_discount(Money::from_minor(1000, USD));

        let snapshot = coupon.snapshot();

        assert_eq!(snapshot.code(), "WELCOME10");
        assert_eq!(snapshot.kind(), coupon.kind());
        assert_eq!(
            snapshot.min_order_amount(),
            Some(&Money::from_minor(5000, USD))
        );
        assert_eq!(snapshot.max_discount(), Some(&Money::from_minor(1000, USD)));
    }

    #[test]
    fn consume_increments_usage_count() -> TestResult {
        let mut registry = CouponRegistry::new();
        registry.insert(ten_percent().with_usage_limit(2));

        registry.consume("welcome10")?;

        assert_eq!(registry.get("WELCOME10").map(Coupon::usage_count), Some(1));

        Ok(())
    }

    #[test]
    fn consume_at_limit_fails_without_overshooting() -> TestResult {
        let mut registry = CouponRegistry::new();
        registry.insert(ten_percent().with_usage_limit(1));

        registry.consume("WELCOME10")?;
        let result = registry.consume("WELCOME10");

        assert_eq!(
            result,
            Err(ConsumeError::UsageLimitReached("WELCOME10".to_string()))
        );
        assert_eq!(registry.get("WELCOME10").map(Coupon::usage_count), Some(1));

        Ok(())
    }

    #[test]
    fn consume_unknown_code_errors() {
        let mut registry = CouponRegistry::new();

        let result = registry.consume("MISSING");

        assert_eq!(
            result,
            Err(ConsumeError::UnknownCode("MISSING".to_string()))
        );
    }

    #[test]
    fn consume_without_limit_never_exhausts() -> TestResult {
        let mut registry = CouponRegistry::new();
        registry.insert(ten_percent());

        for _ in 0..100 {
            registry.consume("WELCOME10")?;
        }

        assert_eq!(
            registry.get("WELCOME10").map(Coupon::usage_count),
            Some(100)
        );

        Ok(())
    }

    #[test]
    fn admin_edit_can_reset_usage_count() -> TestResult {
        let mut registry = CouponRegistry::new();
        registry.insert(ten_percent().with_usage_limit(1));

        registry.consume("WELCOME10")?;

        if let Some(coupon) = registry.get_mut("WELCOME10") {
            coupon.set_usage_count(0);
        }

        registry.consume("WELCOME10")?;

        Ok(())
    }
}

//! Config
//!
//! YAML-backed coupon registries and pricing policies. Prices use the
//! `"AMOUNT CURRENCY"` string format (e.g., `"5.99 USD"`) and rates accept
//! either a percent suffix (`"8%"`) or a bare fraction (`"0.08"`).

use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashMap;
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    coupons::{Coupon, CouponKind, CouponRegistry},
    policy::PricingPolicy,
};

/// Config parsing errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config files
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Unknown coupon kind
    #[error("Unknown coupon kind: {0}")]
    UnknownCouponKind(String),
}

/// Wrapper for coupons in YAML
#[derive(Debug, Deserialize)]
pub struct CouponsConfig {
    /// Map of coupon code -> coupon config
    pub coupons: FxHashMap<String, CouponConfig>,
}

/// One coupon as configured in YAML.
#[derive(Debug, Deserialize)]
pub struct CouponConfig {
    /// Shopper-facing description
    pub description: String,

    /// Discount kind: `percentage` or `fixed`
    pub kind: String,

    /// Discount value: a rate (e.g., `"10%"`) or a price (e.g., `"20.00 USD"`)
    pub value: String,

    /// Minimum order subtotal (e.g., `"50.00 USD"`)
    #[serde(default)]
    pub min_order_amount: Option<String>,

    /// Cap on the granted discount (e.g., `"10.00 USD"`)
    #[serde(default)]
    pub max_discount: Option<String>,

    /// Maximum number of redemptions
    #[serde(default)]
    pub usage_limit: Option<u32>,

    /// Expiry timestamp (RFC 3339)
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Whether the coupon is switched on (defaults to true)
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CouponConfig {
    /// Build a [`Coupon`] from this config under the given code.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the kind is unknown or a price or
    /// percentage string cannot be parsed.
    pub fn into_coupon(self, code: &str) -> Result<Coupon<'static>, ConfigError> {
        let kind = match self.kind.as_str() {
            "percentage" => CouponKind::Percentage(parse_percentage(&self.value)?),
            "fixed" => {
                let (minor_units, currency) = parse_price(&self.value)?;
                CouponKind::Fixed(Money::from_minor(minor_units, currency))
            }
            other => return Err(ConfigError::UnknownCouponKind(other.to_string())),
        };

        let mut coupon = Coupon::new(code, self.description, kind);

        if let Some(min) = self.min_order_amount {
            let (minor_units, currency) = parse_price(&min)?;
            coupon = coupon.with_min_order_amount(Money::from_minor(minor_units, currency));
        }

        if let Some(cap) = self.max_discount {
            let (minor_units, currency) = parse_price(&cap)?;
            coupon = coupon.with_max_discount(Money::from_minor(minor_units, currency));
        }

        if let Some(limit) = self.usage_limit {
            coupon = coupon.with_usage_limit(limit);
        }

        if let Some(expires_at) = self.expires_at {
            coupon = coupon.with_expiry(expires_at);
        }

        coupon.set_active(self.active);

        Ok(coupon)
    }
}

/// A pricing policy as configured in YAML.
#[derive(Debug, Deserialize)]
pub struct PolicyConfig {
    /// Tax rate (e.g., `"8%"`)
    pub tax_rate: String,

    /// Flat shipping fee (e.g., `"5.99 USD"`)
    pub flat_shipping: String,

    /// Optional free-shipping threshold (e.g., `"100.00 USD"`)
    #[serde(default)]
    pub free_shipping_threshold: Option<String>,
}

impl TryFrom<PolicyConfig> for PricingPolicy<'_> {
    type Error = ConfigError;

    fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
        let tax_rate = parse_percentage(&config.tax_rate)?;

        let (shipping_minor, currency) = parse_price(&config.flat_shipping)?;
        let mut policy = PricingPolicy::new(tax_rate, Money::from_minor(shipping_minor, currency));

        if let Some(threshold) = config.free_shipping_threshold {
            let (threshold_minor, threshold_currency) = parse_price(&threshold)?;
            policy = policy.with_free_shipping_threshold(Money::from_minor(
                threshold_minor,
                threshold_currency,
            ));
        }

        Ok(policy)
    }
}

/// Parse a coupon registry from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML or any coupon field cannot be parsed.
pub fn coupons_from_str(contents: &str) -> Result<CouponRegistry<'static>, ConfigError> {
    let config: CouponsConfig = serde_norway::from_str(contents)?;
    let mut registry = CouponRegistry::new();

    for (code, coupon_config) in config.coupons {
        registry.insert(coupon_config.into_coupon(&code)?);
    }

    Ok(registry)
}

/// Load a coupon registry from a YAML file.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read or parsed.
pub fn load_coupons(path: impl AsRef<Path>) -> Result<CouponRegistry<'static>, ConfigError> {
    let contents = fs::read_to_string(path)?;

    coupons_from_str(&contents)
}

/// Parse a pricing policy from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML or any policy field cannot be parsed.
pub fn policy_from_str(contents: &str) -> Result<PricingPolicy<'static>, ConfigError> {
    let config: PolicyConfig = serde_norway::from_str(contents)?;

    config.try_into()
}

/// Load a pricing policy from a YAML file.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read or parsed.
pub fn load_policy(path: impl AsRef<Path>) -> Result<PricingPolicy<'static>, ConfigError> {
    let contents = fs::read_to_string(path)?;

    policy_from_str(&contents)
}

/// Parse price string (e.g., "2.99 USD") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a non-negative decimal, or if the
/// currency code is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), ConfigError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    if parts.len() != 2 {
        return Err(ConfigError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    }

    let amount = parts
        .first()
        .ok_or_else(|| ConfigError::InvalidPrice(s.to_string()))?
        .parse::<Decimal>()
        .map_err(|_err| ConfigError::InvalidPrice(s.to_string()))?;

    let minor_units = amount
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| ConfigError::InvalidPrice(s.to_string()))?;

    if minor_units < 0 {
        return Err(ConfigError::InvalidPrice(format!(
            "Amounts cannot be negative: {s}"
        )));
    }

    let currency_code = parts
        .get(1)
        .ok_or_else(|| ConfigError::InvalidPrice(s.to_string()))?;

    let currency = match *currency_code {
        "GBP" => GBP,
        "USD" => USD,
        "EUR" => EUR,
        other => return Err(ConfigError::UnknownCurrency(other.to_string())),
    };

    Ok((minor_units, currency))
}

/// Parse percentage string (e.g., "8%" or "0.08") into a `Percentage`
///
/// Accepts two formats:
/// - Percentage format: "8%" for 8%
/// - Decimal format: "0.08" for 8%
///
/// # Errors
///
/// Returns an error if the string cannot be parsed as a number.
pub fn parse_percentage(s: &str) -> Result<Percentage, ConfigError> {
    let trimmed = s.trim();

    if let Some(percent_str) = trimmed.strip_suffix('%') {
        let value = percent_str
            .trim()
            .parse::<f64>()
            .map_err(|_err| ConfigError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(value / 100.0))
    } else {
        let value = trimmed
            .parse::<f64>()
            .map_err(|_err| ConfigError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(value))
    }
}

//! Orders

use std::fmt;

use chrono::{DateTime, Utc};
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::{
    cart::Cart,
    coupons::{ConsumeError, CouponRegistry},
    lines::CartLine,
    policy::PricingPolicy,
    pricing::{PricingError, compute_totals},
};

/// Errors that can occur while placing or updating an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An order needs at least one line.
    #[error("cannot place an order from an empty cart")]
    EmptyCart,

    /// Errors bubbled up from total computation.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Errors bubbled up from coupon consumption.
    #[error(transparent)]
    Coupon(#[from] ConsumeError),

    /// The requested fulfilment status change is not allowed.
    #[error("order cannot move from {from} to {to}")]
    InvalidStatusTransition {
        /// Current fulfilment status.
        from: OrderStatus,
        /// Requested fulfilment status.
        to: OrderStatus,
    },

    /// The requested payment status change is not allowed.
    #[error("payment cannot move from {from} to {to}")]
    InvalidPaymentTransition {
        /// Current payment status.
        from: PaymentStatus,
        /// Requested payment status.
        to: PaymentStatus,
    },
}

/// Fulfilment status of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    /// Placed, not yet confirmed.
    Pending,
    /// Accepted by the back office.
    Confirmed,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled before shipping.
    Cancelled,
}

impl OrderStatus {
    /// Whether an order in this status may move to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Confirmed | OrderStatus::Cancelled)
                | (OrderStatus::Confirmed, OrderStatus::Shipped | OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };

        f.write_str(name)
    }
}

/// Payment status of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Awaiting payment.
    Pending,
    /// Payment captured.
    Paid,
    /// Payment attempt failed; may be retried.
    Failed,
    /// Payment returned to the customer.
    Refunded,
}

impl PaymentStatus {
    /// Whether a payment in this status may move to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid | PaymentStatus::Failed)
                | (PaymentStatus::Failed, PaymentStatus::Paid)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };

        f.write_str(name)
    }
}

/// One purchased line, frozen at the moment of purchase.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLine<'a> {
    name: String,
    unit_price: Money<'a, Currency>,
    quantity: u32,
}

impl<'a> OrderLine<'a> {
    /// Get the product name at time of purchase.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the unit price at time of purchase.
    #[must_use]
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Get the purchased quantity.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

impl<'a> From<&CartLine<'a>> for OrderLine<'a> {
    fn from(line: &CartLine<'a>) -> Self {
        OrderLine {
            name: line.name().to_string(),
            unit_price: *line.unit_price(),
            quantity: line.quantity(),
        }
    }
}

/// An immutable monetary snapshot taken at checkout completion.
///
/// Status fields transition afterwards, but the lines and amounts are frozen
/// at creation and never recomputed.
#[derive(Clone, Debug)]
pub struct Order<'a> {
    items: SmallVec<[OrderLine<'a>; 10]>,
    subtotal: Money<'a, Currency>,
    shipping: Money<'a, Currency>,
    tax: Money<'a, Currency>,
    discount: Money<'a, Currency>,
    coupon_code: Option<String>,
    total: Money<'a, Currency>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
}

impl<'a> Order<'a> {
    /// Get the purchased lines.
    #[must_use]
    pub fn items(&self) -> &[OrderLine<'a>] {
        &self.items
    }

    /// Get the subtotal at time of purchase.
    #[must_use]
    pub fn subtotal(&self) -> Money<'a, Currency> {
        self.subtotal
    }

    /// Get the shipping charged.
    #[must_use]
    pub fn shipping(&self) -> Money<'a, Currency> {
        self.shipping
    }

    /// Get the tax charged.
    #[must_use]
    pub fn tax(&self) -> Money<'a, Currency> {
        self.tax
    }

    /// Get the discount applied.
    #[must_use]
    pub fn discount(&self) -> Money<'a, Currency> {
        self.discount
    }

    /// Get the coupon code redeemed by this order, if any.
    #[must_use]
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    /// Get the amount charged.
    #[must_use]
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Get the fulfilment status.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Get the payment status.
    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Get the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Move the order to a new fulfilment status.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` if the transition is not allowed.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;

        Ok(())
    }

    /// Move the order to a new payment status.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` if the transition is not allowed.
    pub fn transition_payment_to(&mut self, next: PaymentStatus) -> Result<(), OrderError> {
        if !self.payment_status.can_transition_to(next) {
            return Err(OrderError::InvalidPaymentTransition {
                from: self.payment_status,
                to: next,
            });
        }

        self.payment_status = next;

        Ok(())
    }
}

/// Turn a cart into an order: compute totals, redeem the coupon, snapshot the
/// lines, and clear the cart.
///
/// The coupon is consumed only when it actually discounted this order; a
/// coupon that became ineligible between application and checkout (for
/// example, an item was removed and the subtotal fell under its minimum) is
/// simply ignored. Consumption happens exactly once, before the cart is
/// cleared, and failure leaves the cart intact so the shopper can recover.
///
/// # Errors
///
/// Returns an `OrderError` if the cart is empty, totals cannot be computed,
/// or the coupon was exhausted by a competing checkout.
pub fn place_order<'a>(
    cart: &mut Cart<'a>,
    registry: &mut CouponRegistry<'a>,
    policy: &PricingPolicy<'a>,
    now: DateTime<Utc>,
) -> Result<Order<'a>, OrderError> {
    if cart.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let totals = compute_totals(cart, policy)?;

    let coupon_code = match cart.applied_coupon() {
        Some(applied) if totals.discount().to_minor_units() > 0 => {
            registry.consume(applied.code())?;
            Some(applied.code().to_string())
        }
        _ => None,
    };

    let items: SmallVec<[OrderLine<'a>; 10]> = cart.iter().map(OrderLine::from).collect();

    let order = Order {
        items,
        subtotal: totals.subtotal(),
        shipping: totals.shipping(),
        tax: totals.tax(),
        discount: totals.discount(),
        coupon_code,
        total: totals.total(),
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        created_at: now,
    };

    cart.clear();

    debug!(
        total_minor = order.total.to_minor_units(),
        coupon = order.coupon_code.as_deref().unwrap_or("none"),
        "order placed"
    );

    Ok(order)
}

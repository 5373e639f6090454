//! Cart Lines

use rusty_money::{Money, iso::Currency};

/// A single cart line: one product at a unit price, counted.
///
/// Quantity is always clamped to `[1, max_quantity]` (or `[1, ∞)` when no
/// maximum is set). Out-of-range requests are clamped silently rather than
/// rejected; removing a line is a separate operation on the cart.
#[derive(Clone, Debug, PartialEq)]
pub struct CartLine<'a> {
    id: String,
    name: String,
    unit_price: Money<'a, Currency>,
    quantity: u32,
    max_quantity: Option<u32>,
}

impl<'a> CartLine<'a> {
    /// Create a new line with the given quantity (clamped to at least 1).
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money<'a, Currency>,
        quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            quantity: quantity.max(1),
            max_quantity: None,
        }
    }

    /// Set a per-line quantity cap, re-clamping the current quantity.
    ///
    /// A cap below 1 is raised to 1, since a line always holds at least one
    /// unit.
    #[must_use]
    pub fn with_max_quantity(mut self, max_quantity: u32) -> Self {
        self.max_quantity = Some(max_quantity.max(1));
        self.quantity = self.clamp(self.quantity);
        self
    }

    /// Set the quantity, clamped to `[1, max_quantity]`.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = self.clamp(quantity);
    }

    /// Increase the quantity, clamped to `[1, max_quantity]`.
    pub fn add_quantity(&mut self, quantity: u32) {
        self.quantity = self.clamp(self.quantity.saturating_add(quantity));
    }

    /// Get the line id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the unit price.
    #[must_use]
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Get the quantity.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Get the quantity cap, if any.
    #[must_use]
    pub fn max_quantity(&self) -> Option<u32> {
        self.max_quantity
    }

    fn clamp(&self, quantity: u32) -> u32 {
        quantity.clamp(1, self.max_quantity.unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;

    use super::*;

    fn line() -> CartLine<'static> {
        CartLine::new("sku-1", "Widget", Money::from_minor(250, USD), 2)
    }

    #[test]
    fn new_clamps_zero_quantity_to_one() {
        let line = CartLine::new("sku-1", "Widget", Money::from_minor(250, USD), 0);

        assert_eq!(line.quantity(), 1);
    }

    #[test]
    fn set_quantity_clamps_below_one() {
        let mut line = line();

        line.set_quantity(0);

        assert_eq!(line.quantity(), 1);
    }

    #[test]
    fn set_quantity_clamps_above_max() {
        let mut line = line().with_max_quantity(5);

        line.set_quantity(9);

        assert_eq!(line.quantity(), 5);
    }

    #[test]
    fn with_max_quantity_reclamps_current_quantity() {
        let line = CartLine::new("sku-1", "Widget", Money::from_minor(250, USD), 8)
            .with_max_quantity(3);

        assert_eq!(line.quantity(), 3);
        assert_eq!(line.max_quantity(), Some(3));
    }

    #[test]
    fn with_max_quantity_raises_zero_cap_to_one() {
        let line = line().with_max_quantity(0);

        assert_eq!(line.max_quantity(), Some(1));
        assert_eq!(line.quantity(), 1);
    }

    #[test]
    fn add_quantity_saturates_at_max() {
        let mut line = line().with_max_quantity(4);

        line.add_quantity(10);

        assert_eq!(line.quantity(), 4);
    }

    #[test]
    fn accessors_return_constructor_values() {
        let line = line();

        assert_eq!(line.id(), "sku-1");
        assert_eq!(line.name(), "Widget");
        assert_eq!(line.unit_price(), &Money::from_minor(250, USD));
        assert_eq!(line.quantity(), 2);
        assert_eq!(line.max_quantity(), None);
    }
}

//! Shopping cart state.
//!
//! The cart is a short, insertion-ordered list of lines keyed by product id.
//! Totals are recomputed from the lines on every read.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::product::{Product, ProductSnapshot};
use crate::types::{Price, ProductId};

/// One product in the cart with its quantity.
///
/// The quantity is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductSnapshot,
    quantity: u32,
}

impl CartLine {
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity
    }
}

/// Result of [`Cart::update_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineUpdate {
    /// The line now holds this quantity.
    Updated(u32),
    /// The requested quantity was below 1, so the line was dropped.
    Removed,
    /// No line for that product.
    NotInCart,
}

/// Order summary figures shown next to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    pub item_count: u32,
    pub subtotal: Price,
    pub shipping: Price,
    pub tax: Price,
    pub total: Price,
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line grows by `quantity`; otherwise a new line is appended.
    /// A quantity of 0 counts as 1. Returns the line's new quantity.
    pub fn add(&mut self, product: &Product, quantity: u32) -> u32 {
        let quantity = quantity.max(1);
        if let Some(line) = self.line_mut(&product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
            return line.quantity;
        }
        self.lines.push(CartLine {
            product: product.snapshot(),
            quantity,
        });
        quantity
    }

    /// Remove the line for `product_id`, returning it if it existed.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|line| line.product_id() == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Set the quantity of an existing line. Quantities below 1 remove it.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> LineUpdate {
        if quantity < 1 {
            return match self.remove(product_id) {
                Some(_) => LineUpdate::Removed,
                None => LineUpdate::NotInCart,
            };
        }
        match self.line_mut(product_id) {
            Some(line) => {
                line.quantity = quantity;
                LineUpdate::Updated(quantity)
            }
            None => LineUpdate::NotInCart,
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities across all lines (the cart badge).
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines
            .iter()
            .fold(0, |sum, line| sum.saturating_add(line.quantity))
    }

    /// Sum of price times quantity across all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Subtotal, free shipping, tax at `tax_rate` and the grand total.
    #[must_use]
    pub fn summary(&self, tax_rate: Decimal) -> CartSummary {
        let subtotal = self.total_price();
        let tax = subtotal.scaled(tax_rate);
        CartSummary {
            item_count: self.total_items(),
            subtotal,
            shipping: Price::ZERO,
            tax,
            total: subtotal + tax,
        }
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id() == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Listing;

    fn product(id: u64, cents: i64) -> Product {
        Product::new(
            ProductId::from(id),
            format!("Product {id}"),
            Price::from_cents(cents),
            "seller",
            Listing::BuyItNow,
        )
    }

    #[test]
    fn totals_follow_adds_and_removes() {
        let a = product(1, 1000);
        let b = product(2, 500);
        let mut cart = Cart::new();

        cart.add(&a, 2);
        cart.add(&b, 1);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price(), Price::from_cents(2500));

        cart.remove(&a.id);
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.total_price(), Price::from_cents(500));

        cart.clear();
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), Price::ZERO);
        assert!(cart.is_empty());
    }

    #[test]
    fn repeated_adds_sum_quantities() {
        let a = product(1, 1999);
        let mut cart = Cart::new();
        for amount in [1, 4, 2, 3] {
            cart.add(&a, amount);
        }
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(&a.id).map(CartLine::quantity), Some(10));
        assert_eq!(cart.total_price(), Price::from_cents(19_990));
    }

    #[test]
    fn zero_quantity_add_counts_as_one() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(&product(1, 100), 0), 1);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut cart = Cart::new();
        cart.add(&product(1, 100), 1);
        let before = cart.clone();

        assert!(cart.remove(&ProductId::new("missing")).is_none());
        assert_eq!(cart, before);
    }

    #[test]
    fn update_quantity_sets_or_removes() {
        let a = product(1, 250);
        let mut cart = Cart::new();
        cart.add(&a, 1);

        assert_eq!(cart.update_quantity(&a.id, 5), LineUpdate::Updated(5));
        assert_eq!(cart.total_price(), Price::from_cents(1250));

        assert_eq!(cart.update_quantity(&a.id, 0), LineUpdate::Removed);
        assert!(cart.is_empty());

        assert_eq!(cart.update_quantity(&a.id, 3), LineUpdate::NotInCart);
        assert_eq!(cart.update_quantity(&a.id, 0), LineUpdate::NotInCart);
    }

    #[test]
    fn lines_keep_insertion_order() {
        let mut cart = Cart::new();
        cart.add(&product(3, 100), 1);
        cart.add(&product(1, 100), 1);
        cart.add(&product(3, 100), 1);
        let ids: Vec<&str> = cart.lines().iter().map(|l| l.product_id().as_str()).collect();
        assert_eq!(ids, ["3", "1"]);
    }

    #[test]
    fn summary_adds_tax_and_free_shipping() {
        let mut cart = Cart::new();
        cart.add(&product(1, 1000), 2);
        cart.add(&product(2, 500), 1);

        let summary = cart.summary(Decimal::new(8, 2));
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, Price::from_cents(2500));
        assert_eq!(summary.shipping, Price::ZERO);
        assert_eq!(summary.tax, Price::from_cents(200));
        assert_eq!(summary.total, Price::from_cents(2700));
    }
}

//! Shopper cart aggregate.
//!
//! Every mutation returns a [`CartChange`] naming the single row write the
//! caller has to persist, so in-memory and stored state never drift apart
//! silently.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::catalog::PriceSnapshot;

/// One product (at one pack size) with a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub line_key: String,
    pub product_id: String,
    pub pack_size: Option<String>,
    pub name: String,
    /// Price captured when the line was first added.
    #[schema(value_type = String, example = "549")]
    pub unit_price: Decimal,
    pub image_url: Option<String>,
    pub category: String,
    pub quantity: i32,
}

impl CartLine {
    pub fn from_snapshot(
        product_id: &str,
        snapshot: PriceSnapshot,
        image_url: Option<String>,
        category: String,
    ) -> Self {
        Self {
            line_key: snapshot.line_key,
            product_id: product_id.to_string(),
            pack_size: snapshot.pack_size,
            name: snapshot.name,
            unit_price: snapshot.unit_price,
            image_url,
            category,
            quantity: 1,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The row write a cart mutation requires.
#[derive(Debug, Clone, PartialEq)]
pub enum CartChange {
    Inserted(CartLine),
    Updated(CartLine),
    Removed(String),
    Cleared,
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from stored rows. Rows with a non-positive quantity are
    /// dropped and duplicate keys are merged.
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity <= 0 {
                continue;
            }
            let quantity = line.quantity;
            cart.add_item(line, quantity);
        }
        cart
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    pub fn get(&self, line_key: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.line_key == line_key)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds `quantity` units of `item`. An existing line with the same key is
    /// incremented and keeps its original price snapshot.
    pub fn add_item(&mut self, item: CartLine, quantity: i32) -> CartChange {
        let quantity = quantity.max(1);

        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|line| line.line_key == item.line_key)
        {
            existing.quantity = existing.quantity.saturating_add(quantity);
            return CartChange::Updated(existing.clone());
        }

        let line = CartLine { quantity, ..item };
        self.lines.push(line.clone());
        CartChange::Inserted(line)
    }

    pub fn remove_item(&mut self, line_key: &str) -> CartChange {
        let before = self.lines.len();
        self.lines.retain(|line| line.line_key != line_key);
        if self.lines.len() == before {
            CartChange::Unchanged
        } else {
            CartChange::Removed(line_key.to_string())
        }
    }

    /// Sets the quantity directly; zero or below removes the line. There is
    /// no upper bound.
    pub fn update_quantity(&mut self, line_key: &str, new_quantity: i32) -> CartChange {
        if new_quantity <= 0 {
            return self.remove_item(line_key);
        }

        match self.lines.iter_mut().find(|line| line.line_key == line_key) {
            Some(line) if line.quantity == new_quantity => CartChange::Unchanged,
            Some(line) => {
                line.quantity = new_quantity;
                CartChange::Updated(line.clone())
            }
            None => CartChange::Unchanged,
        }
    }

    pub fn clear(&mut self) -> CartChange {
        if self.lines.is_empty() {
            return CartChange::Unchanged;
        }
        self.lines.clear();
        CartChange::Cleared
    }

    pub fn total_items(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    pub fn total_price(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(key: &str, price: i64) -> CartLine {
        CartLine {
            line_key: key.into(),
            product_id: key.split(':').next().unwrap_or(key).into(),
            pack_size: None,
            name: key.into(),
            unit_price: Decimal::from(price),
            image_url: None,
            category: "Bars".into(),
            quantity: 1,
        }
    }

    #[test]
    fn adding_same_key_twice_merges() {
        let mut cart = Cart::new();

        assert!(matches!(
            cart.add_item(line("mango-milk", 549), 1),
            CartChange::Inserted(_)
        ));
        assert!(matches!(
            cart.add_item(line("mango-milk", 549), 1),
            CartChange::Updated(ref l) if l.quantity == 2
        ));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_items(), 2);
    }

    #[test]
    fn pack_sizes_are_distinct_lines() {
        let mut cart = Cart::new();
        cart.add_item(line("mango-milk", 549), 1);
        cart.add_item(line("mango-milk:6 pack", 2799), 1);

        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn merge_keeps_first_price_snapshot() {
        let mut cart = Cart::new();
        cart.add_item(line("mango-milk", 549), 1);
        cart.add_item(line("mango-milk", 599), 1);

        assert_eq!(cart.total_price(), Decimal::from(1098));
    }

    #[test]
    fn add_n_at_once_and_floor_at_one() {
        let mut cart = Cart::new();
        cart.add_item(line("hazelnut-dark", 399), 3);
        cart.add_item(line("hazelnut-dark", 399), 0);

        assert_eq!(cart.get("hazelnut-dark").map(|l| l.quantity), Some(4));
    }

    #[test]
    fn update_to_zero_or_negative_removes() {
        let mut cart = Cart::new();
        cart.add_item(line("a", 10), 2);
        cart.add_item(line("b", 10), 2);

        assert_eq!(cart.update_quantity("a", 0), CartChange::Removed("a".into()));
        assert_eq!(cart.update_quantity("b", -5), CartChange::Removed("b".into()));
        assert!(cart.is_empty());
    }

    #[test]
    fn update_sets_quantity_without_upper_bound() {
        let mut cart = Cart::new();
        cart.add_item(line("a", 10), 1);

        cart.update_quantity("a", 500);

        assert_eq!(cart.total_items(), 500);
        assert_eq!(cart.update_quantity("a", 500), CartChange::Unchanged);
    }

    #[test]
    fn missing_keys_are_no_ops() {
        let mut cart = Cart::new();

        assert_eq!(cart.remove_item("nope"), CartChange::Unchanged);
        assert_eq!(cart.update_quantity("nope", 3), CartChange::Unchanged);
        assert_eq!(cart.clear(), CartChange::Unchanged);
    }

    #[test]
    fn totals() {
        let mut cart = Cart::new();
        cart.add_item(line("a", 549), 2);
        cart.add_item(line("b", 120), 3);

        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price(), Decimal::from(549 * 2 + 120 * 3));

        assert_eq!(cart.clear(), CartChange::Cleared);
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn from_lines_drops_bad_rows_and_merges_duplicates() {
        let mut dup = line("a", 10);
        dup.quantity = 2;
        let mut zero = line("b", 10);
        zero.quantity = 0;

        let cart = Cart::from_lines(vec![line("a", 10), dup, zero]);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_items(), 3);
    }
}

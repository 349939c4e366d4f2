//! Cart snapshot types.
//!
//! A cart is priced live: every read joins the current catalog price. That
//! is deliberately different from an order, whose total is frozen at
//! checkout and never recomputed.

use quickbites_core::{CartId, CartItemId, MenuItemId, Money, MoneyError, UserId};

/// One cart line with its current catalog price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Cart line ID.
    pub id: CartItemId,
    /// Menu item in the line.
    pub menu_item_id: MenuItemId,
    /// Menu item name at read time.
    pub name: String,
    /// Quantity.
    pub quantity: u32,
    /// Current catalog price for one unit.
    pub unit_price: Money,
}

impl CartLine {
    /// Price of the whole line at current catalog prices.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the subtotal is not representable.
    pub fn subtotal(&self) -> Result<Money, MoneyError> {
        self.unit_price.times(self.quantity)
    }
}

/// A user's cart as read at a single point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Cart ID (cleared on successful checkout).
    pub id: CartId,
    /// Owner.
    pub user_id: UserId,
    /// Lines in insertion order.
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines (the cart badge count).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Live total at current catalog prices.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the total is not representable.
    pub fn total(&self) -> Result<Money, MoneyError> {
        let subtotals = self
            .lines
            .iter()
            .map(CartLine::subtotal)
            .collect::<Result<Vec<_>, _>>()?;
        Money::total(subtotals)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, quantity: u32, price: &str) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            menu_item_id: MenuItemId::new(id),
            name: format!("item {id}"),
            quantity,
            unit_price: price.parse().unwrap(),
        }
    }

    #[test]
    fn test_total_sums_lines() {
        let cart = CartSnapshot {
            id: CartId::new(1),
            user_id: UserId::new(1),
            lines: vec![line(1, 2, "5.00"), line(2, 1, "3.50")],
        };
        assert_eq!(cart.total().unwrap().to_string(), "13.50");
        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn test_empty_cart_totals_zero() {
        let cart = CartSnapshot {
            id: CartId::new(1),
            user_id: UserId::new(1),
            lines: vec![],
        };
        assert!(cart.is_empty());
        assert_eq!(cart.total().unwrap(), Money::ZERO);
    }
}

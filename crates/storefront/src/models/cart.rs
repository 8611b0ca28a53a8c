//! Cart and cart line models.
//!
//! A line is identified by the tuple (product, size, color, variant): adding
//! a matching combination increments the existing line instead of creating a
//! duplicate. The cart total is always derived from the lines; a total read
//! back from storage is recomputed before use, never trusted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tamarind_core::{LineId, ProductId, VariantId};

/// One distinct product+variant entry in the cart, with its own quantity.
///
/// `name`, `unit_price`, and `image` are a display snapshot taken when the
/// line was created or last refreshed from the backend; they do not track
/// live catalog changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Client-generated identity used for update/remove operations.
    pub line_id: LineId,
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    /// Normalized image reference, treated as an opaque string.
    pub image: String,
    /// Always positive; a line is removed instead of reaching zero.
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// Human-readable label of the selected variant, when any.
    #[serde(default)]
    pub variant_label: Option<String>,
}

impl CartLine {
    /// The identity tuple distinguishing lines within a cart.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id,
            size: self.size.clone(),
            color: self.color.clone(),
            variant_id: self.variant_id,
        }
    }

    /// `quantity * unit_price` for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    /// Whether this line matches the login-merge key of (product, size,
    /// color). The merge deliberately ignores `variant_id`; remote lines
    /// are matched on the variant discriminators the backend keys by.
    #[must_use]
    pub fn matches_merge_key(
        &self,
        product_id: ProductId,
        size: Option<&str>,
        color: Option<&str>,
    ) -> bool {
        self.product_id == product_id
            && self.size.as_deref() == size
            && self.color.as_deref() == color
    }
}

/// The identity tuple of a cart line.
///
/// Also the key the backend uses for update/delete calls, since the remote
/// has no concept of the client's internal line IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
}

/// Everything needed to create a new cart line except the quantity and the
/// generated line ID.
#[derive(Debug, Clone)]
pub struct LineDraft {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub image: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub variant_id: Option<VariantId>,
    pub variant_label: Option<String>,
}

impl LineDraft {
    /// The identity tuple this draft would occupy in the cart.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id,
            size: self.size.clone(),
            color: self.color.clone(),
            variant_id: self.variant_id,
        }
    }

    /// Materialize the draft into a line with the given ID and quantity.
    #[must_use]
    pub fn into_line(self, line_id: LineId, quantity: u32) -> CartLine {
        CartLine {
            line_id,
            product_id: self.product_id,
            name: self.name,
            unit_price: self.unit_price,
            image: self.image,
            quantity,
            size: self.size,
            color: self.color,
            variant_id: self.variant_id,
            variant_label: self.variant_label,
        }
    }
}

/// The shopping cart: an ordered sequence of lines plus a derived total.
///
/// Line order is insertion order, preserved for display stability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub lines: Vec<CartLine>,
    /// Derived; recomputed on every mutation and on every load.
    #[serde(default)]
    pub total: Decimal,
}

impl Cart {
    /// Build a cart from lines, computing the total.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self {
            lines,
            total: Decimal::ZERO,
        };
        cart.recompute_total();
        cart
    }

    /// Recompute `total` as the sum of `quantity * unit_price` over all lines.
    pub fn recompute_total(&mut self) {
        self.total = self.lines.iter().map(CartLine::line_total).sum();
    }

    /// Total number of items across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find the position of the line with the given identity tuple.
    #[must_use]
    pub fn position_of_key(&self, key: &LineKey) -> Option<usize> {
        self.lines.iter().position(|l| &l.key() == key)
    }

    /// Find the position of the line with the given line ID.
    #[must_use]
    pub fn position_of_line(&self, line_id: &LineId) -> Option<usize> {
        self.lines.iter().position(|l| &l.line_id == line_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn draft(product_id: i64, price: &str, size: Option<&str>) -> LineDraft {
        LineDraft {
            product_id: ProductId::new(product_id),
            name: format!("Product {product_id}"),
            unit_price: price.parse().unwrap(),
            image: "uploads/product.jpg".to_owned(),
            size: size.map(str::to_owned),
            color: None,
            variant_id: None,
            variant_label: None,
        }
    }

    #[test]
    fn test_total_is_sum_of_line_totals() {
        let cart = Cart::from_lines(vec![
            draft(1, "19.99", Some("M")).into_line(LineId::from("a"), 2),
            draft(2, "5.00", None).into_line(LineId::from("b"), 3),
        ]);
        assert_eq!(cart.total, "54.98".parse::<Decimal>().unwrap());
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_stored_total_is_not_trusted() {
        // A corrupted stored total is overwritten by recomputation.
        let json = r#"{"lines":[{"line_id":"a","product_id":1,"name":"P","unit_price":"10.00","image":"","quantity":2}],"total":"999.00"}"#;
        let mut cart: Cart = serde_json::from_str(json).unwrap();
        cart.recompute_total();
        assert_eq!(cart.total, "20.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_line_key_distinguishes_variants() {
        let a = draft(1, "10.00", Some("M")).into_line(LineId::from("a"), 1);
        let b = draft(1, "10.00", Some("L")).into_line(LineId::from("b"), 1);
        let c = draft(1, "10.00", Some("M")).into_line(LineId::from("c"), 4);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), c.key());
    }

    #[test]
    fn test_merge_key_ignores_variant_id() {
        let mut line = draft(1, "10.00", Some("M")).into_line(LineId::from("a"), 1);
        line.variant_id = Some(VariantId::new(9));
        assert!(line.matches_merge_key(ProductId::new(1), Some("M"), None));
        assert!(!line.matches_merge_key(ProductId::new(1), Some("L"), None));
        assert!(!line.matches_merge_key(ProductId::new(2), Some("M"), None));
    }
}

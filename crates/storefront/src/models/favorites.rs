//! Favorites model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tamarind_core::ProductId;

/// One favorited product. At most one entry exists per `item_id`.
///
/// `item_id` is the string form of the product ID; the display fields are a
/// snapshot taken when the entry was created or last loaded from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub item_id: String,
    pub name: String,
    pub price: Decimal,
    /// Normalized image reference, treated as an opaque string.
    pub image: String,
}

impl FavoriteEntry {
    /// Create an entry for a product.
    #[must_use]
    pub fn new(product_id: ProductId, name: String, price: Decimal, image: String) -> Self {
        Self {
            item_id: product_id.to_string(),
            name,
            price,
            image,
        }
    }

    /// The product ID this entry refers to, if the stored `item_id` still
    /// parses as one (stored data may predate the current format).
    #[must_use]
    pub fn product_id(&self) -> Option<ProductId> {
        self.item_id.parse::<i64>().ok().map(ProductId::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_is_string_form_of_product_id() {
        let entry = FavoriteEntry::new(
            ProductId::new(42),
            "Candle".to_owned(),
            "12.50".parse().unwrap(),
            String::new(),
        );
        assert_eq!(entry.item_id, "42");
        assert_eq!(entry.product_id(), Some(ProductId::new(42)));
    }

    #[test]
    fn test_unparseable_item_id() {
        let entry = FavoriteEntry {
            item_id: "legacy-slug".to_owned(),
            name: String::new(),
            price: Decimal::ZERO,
            image: String::new(),
        };
        assert!(entry.product_id().is_none());
    }
}

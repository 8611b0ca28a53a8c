//! Wire types for the backend REST API.
//!
//! All payloads are JSON; amounts travel as decimal strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tamarind_core::{OrderId, OrderStatus, PaymentStatus, ProductId, VariantId};

use crate::models::LineKey;

// =============================================================================
// Cart
// =============================================================================

/// A cart line as held by the backend.
///
/// The backend keys lines by (product, size, color, variant); alongside the
/// key and quantity it returns a denormalized product snapshot so lines that
/// exist only remotely can still be displayed after the login merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub variant_label: Option<String>,
}

/// Body of `POST /cart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLinePayload {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
}

impl CartLinePayload {
    /// Build the payload for adding `quantity` of the keyed line.
    #[must_use]
    pub fn from_key(key: &LineKey, quantity: u32) -> Self {
        Self {
            product_id: key.product_id,
            quantity,
            size: key.size.clone(),
            color: key.color.clone(),
            variant_id: key.variant_id,
        }
    }
}

/// Query parameters selecting a remote line for update/delete calls.
#[derive(Debug, Clone, Serialize)]
pub struct LineSelector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
}

impl From<&LineKey> for LineSelector {
    fn from(key: &LineKey) -> Self {
        Self {
            size: key.size.clone(),
            color: key.color.clone(),
            variant_id: key.variant_id,
        }
    }
}

/// Body of `PUT /cart/{product_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: u32,
}

// =============================================================================
// Favorites
// =============================================================================

/// A favorite as held by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFavorite {
    pub product_id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
}

// =============================================================================
// Auth
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// A stock-keeping variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    /// Human-readable size label (e.g., "EU 42").
    pub label: String,
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

const fn default_true() -> bool {
    true
}

/// Full product detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

/// One page of the product list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<ProductSummary>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

// =============================================================================
// Orders & checkout
// =============================================================================

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// A placed order with its payment status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

/// Body of `POST /orders` (checkout submission).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub contact_email: String,
    pub shipping_address: String,
    pub lines: Vec<CartLinePayload>,
}

/// Response of `POST /orders`: the created order and where to send the
/// customer for payment (the third-party widget's URL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub payment_url: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_cart_line_minimal_payload() {
        // The backend may return only the keyed fields; snapshot fields
        // default rather than failing the whole cart fetch.
        let line: RemoteCartLine =
            serde_json::from_str(r#"{"product_id":3,"quantity":2,"size":"M"}"#).unwrap();
        assert_eq!(line.product_id, ProductId::new(3));
        assert_eq!(line.quantity, 2);
        assert_eq!(line.size.as_deref(), Some("M"));
        assert_eq!(line.price, Decimal::ZERO);
        assert!(line.variant_id.is_none());
    }

    #[test]
    fn test_line_selector_skips_absent_discriminators() {
        let key = LineKey {
            product_id: ProductId::new(1),
            size: Some("M".to_owned()),
            color: None,
            variant_id: None,
        };
        let query = serde_json::to_value(LineSelector::from(&key)).unwrap();
        assert_eq!(query, serde_json::json!({"size": "M"}));
    }

    #[test]
    fn test_amounts_travel_as_strings() {
        let summary = ProductSummary {
            id: ProductId::new(1),
            name: "Boot".to_owned(),
            price: "89.90".parse().unwrap(),
            image: String::new(),
            category: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["price"], serde_json::json!("89.90"));
    }
}

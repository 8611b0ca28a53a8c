//! Cart commands.

use tamarind_core::{display_usd, LineId, ProductId, VariantId};
use tamarind_storefront::AppState;
use tamarind_storefront::catalog::normalize_image_url;
use tamarind_storefront::models::{Cart, LineDraft};

/// Print the cart.
pub fn show(state: &AppState) {
    print_cart(&state.cart().cart());
}

/// Add a product to the cart, resolving its display snapshot from the
/// catalog first.
pub async fn add(
    state: &AppState,
    product_id: i64,
    qty: u32,
    size: Option<String>,
    color: Option<String>,
    variant: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let product = state.api().get_product(ProductId::new(product_id)).await?;

    let variant_id = variant.map(VariantId::new);
    let variant_label = variant_id.and_then(|id| {
        product
            .variants
            .iter()
            .find(|v| v.id == id)
            .map(|v| v.label.clone())
    });
    let image = product
        .images
        .first()
        .map(|image| normalize_image_url(&state.config().api_base_url, image))
        .unwrap_or_default();

    let cart = state.cart().add_line(
        LineDraft {
            product_id: product.id,
            name: product.name,
            unit_price: product.price,
            image,
            size,
            color,
            variant_id,
            variant_label,
        },
        qty,
    );
    print_cart(&cart);
    Ok(())
}

/// Overwrite a line's quantity (0 removes the line).
pub fn set(state: &AppState, line_id: &str, qty: u32) {
    let cart = state.cart().set_quantity(&LineId::from(line_id), qty);
    print_cart(&cart);
}

/// Empty the cart, server-side too when logged in.
pub async fn clear(state: &AppState) {
    state.cart().clear_remote_and_local().await;
    println!("Cart cleared.");
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Cart is empty.");
        return;
    }
    for line in &cart.lines {
        let mut choice = Vec::new();
        if let Some(size) = &line.size {
            choice.push(format!("size {size}"));
        }
        if let Some(color) = &line.color {
            choice.push(format!("color {color}"));
        }
        if let Some(label) = &line.variant_label {
            choice.push(label.clone());
        }
        let choice = if choice.is_empty() {
            String::new()
        } else {
            format!(" [{}]", choice.join(", "))
        };
        println!(
            "  {}  {} x{}{}  {}  (line {})",
            line.product_id,
            line.name,
            line.quantity,
            choice,
            display_usd(line.line_total()),
            line.line_id
        );
    }
    println!(
        "  Total: {} ({} items)",
        display_usd(cart.total),
        cart.item_count()
    );
}

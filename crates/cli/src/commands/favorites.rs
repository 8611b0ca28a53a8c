//! Favorites commands.

use tamarind_core::{display_usd, ProductId};
use tamarind_storefront::AppState;
use tamarind_storefront::catalog::normalize_image_url;
use tamarind_storefront::models::FavoriteEntry;
use tamarind_storefront::sync::favorites::ToggleOutcome;

/// Print the favorites.
pub fn list(state: &AppState) {
    let favorites = state.favorites().favorites();
    if favorites.is_empty() {
        println!("No favorites.");
        return;
    }
    for entry in &favorites {
        println!(
            "  {:>6}  {:<40}  {}",
            entry.item_id,
            entry.name,
            display_usd(entry.price)
        );
    }
}

/// Toggle a product's favorited state.
pub async fn toggle(state: &AppState, product_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let product = state.api().get_product(ProductId::new(product_id)).await?;
    let image = product
        .images
        .first()
        .map(|image| normalize_image_url(&state.config().api_base_url, image))
        .unwrap_or_default();

    let outcome = state.favorites().toggle(FavoriteEntry::new(
        product.id,
        product.name.clone(),
        product.price,
        image,
    ));
    match outcome {
        ToggleOutcome::Added => println!("Added {} to favorites.", product.name),
        ToggleOutcome::Removed => println!("Removed {} from favorites.", product.name),
    }
    Ok(())
}

/// Remove all favorites, server-side too when logged in.
pub async fn clear(state: &AppState) {
    state.favorites().clear_remote_and_local().await;
    println!("Favorites cleared.");
}

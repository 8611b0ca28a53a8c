//! Catalog browsing commands.

use tamarind_core::{display_usd, ProductId};
use tamarind_storefront::AppState;
use tamarind_storefront::catalog::ProductQuery;

/// Print one page of the product list.
pub async fn list(
    state: &AppState,
    page: u32,
    search: Option<String>,
    category: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let query = ProductQuery {
        page,
        search,
        category,
        ..ProductQuery::default()
    };
    let result = state.api().get_products(&query).await?;

    println!(
        "Page {}/{} ({} products total)",
        result.page,
        result.total.div_ceil(u64::from(result.per_page)).max(1),
        result.total
    );
    for product in &result.items {
        let category = product.category.as_deref().unwrap_or("-");
        println!(
            "  {:>6}  {:<40}  {:>10}  {}",
            product.id,
            product.name,
            display_usd(product.price),
            category
        );
    }
    Ok(())
}

/// Print one product in detail.
pub async fn show(state: &AppState, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let product = state.api().get_product(ProductId::new(id)).await?;

    println!("{} (#{})", product.name, product.id);
    println!("  Price:    {}", display_usd(product.price));
    if let Some(category) = &product.category {
        println!("  Category: {category}");
    }
    if !product.sizes.is_empty() {
        println!("  Sizes:    {}", product.sizes.join(", "));
    }
    if !product.colors.is_empty() {
        println!("  Colors:   {}", product.colors.join(", "));
    }
    for variant in &product.variants {
        let stock = if variant.in_stock { "" } else { "  (out of stock)" };
        println!("  Variant:  {} #{}{stock}", variant.label, variant.id);
    }
    if !product.description.is_empty() {
        println!("\n{}", product.description);
    }
    Ok(())
}

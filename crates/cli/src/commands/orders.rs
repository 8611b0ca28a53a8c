//! Order history and checkout commands.

use tamarind_core::{display_usd, Email, OrderId};
use tamarind_storefront::AppState;
use tamarind_storefront::api::types::{CartLinePayload, CheckoutRequest};

/// List the logged-in user's orders.
pub async fn list(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let orders = state.api().get_orders().await?;
    if orders.is_empty() {
        println!("No orders.");
        return Ok(());
    }
    for order in &orders {
        println!(
            "  #{:<8}  {}  {:<12}  {:<10}  {}",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.status,
            order.payment_status,
            display_usd(order.total)
        );
    }
    Ok(())
}

/// Show one order with its lines.
pub async fn show(state: &AppState, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let order = state.api().get_order(OrderId::new(id)).await?;
    println!(
        "Order #{} ({})",
        order.id,
        order.created_at.format("%Y-%m-%d %H:%M")
    );
    println!("  Status:  {} / payment {}", order.status, order.payment_status);
    for line in &order.lines {
        println!(
            "  {} x{}  {}",
            line.name,
            line.quantity,
            display_usd(line.unit_price * rust_decimal::Decimal::from(line.quantity))
        );
    }
    println!("  Total: {}", display_usd(order.total));
    Ok(())
}

/// Submit the current cart as an order and print the payment URL.
pub async fn checkout(
    state: &AppState,
    email: String,
    address: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let email = Email::parse(&email)?;
    let cart = state.cart().cart();
    if cart.is_empty() {
        println!("Cart is empty; nothing to check out.");
        return Ok(());
    }

    let request = CheckoutRequest {
        contact_email: email.into_inner(),
        shipping_address: address,
        lines: cart
            .lines
            .iter()
            .map(|line| CartLinePayload::from_key(&line.key(), line.quantity))
            .collect(),
    };
    let response = state.api().checkout(&request).await?;

    println!("Order #{} created.", response.order_id);
    println!("Complete payment at: {}", response.payment_url);

    // The order now owns these items.
    state.cart().clear_remote_and_local().await;
    Ok(())
}

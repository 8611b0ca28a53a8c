//! Authentication commands.

use url::Url;

use tamarind_core::Email;
use tamarind_storefront::AppState;
use tamarind_storefront::api::token_from_callback;
use tamarind_storefront::session::SessionError;

/// Log in with credentials and print the merged cart summary.
pub async fn login(
    state: &AppState,
    email: String,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let email = Email::parse(&email)?;
    let user = state.session().login(email.into_inner(), password).await?;
    println!("Logged in as {} <{}>.", user.name, user.email);
    let cart = state.cart().cart();
    if !cart.is_empty() {
        println!(
            "Cart after sync: {} items, {}.",
            cart.item_count(),
            tamarind_core::display_usd(cart.total)
        );
    }
    Ok(())
}

/// Create an account and start a session.
pub async fn register(
    state: &AppState,
    name: String,
    email: String,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let email = Email::parse(&email)?;
    let user = state
        .session()
        .register(name, email.into_inner(), password)
        .await?;
    println!("Registered and logged in as {} <{}>.", user.name, user.email);
    Ok(())
}

/// Print the URL to open in a browser for Google login.
pub fn google_url(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let url = state.api().google_login_url()?;
    println!("{url}");
    println!("After authorizing, run: tamarind auth oauth <callback-url>");
    Ok(())
}

/// Complete an OAuth flow from the callback URL.
pub async fn complete_oauth(
    state: &AppState,
    callback_url: &Url,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(token) = token_from_callback(callback_url) else {
        tracing::error!("Callback URL carries no token parameter");
        return Err(SessionError::InvalidSession.into());
    };
    let user = state.session().complete_oauth(token).await?;
    println!("Logged in as {} <{}>.", user.name, user.email);
    Ok(())
}

/// Log out and erase local user state.
pub fn logout(state: &AppState) {
    state.session().logout();
    println!("Logged out.");
}

/// Show the current session.
pub fn whoami(state: &AppState) {
    match state.session().handle().user() {
        Some(user) => println!("{} <{}> (user #{})", user.name, user.email, user.id),
        None => println!("Not logged in."),
    }
}

//! Tamarind Market command-line storefront client.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! tamarind products --page 1
//! tamarind product 42
//!
//! # Cart (works anonymously; syncs once logged in)
//! tamarind cart add 42 --qty 2 --size M
//! tamarind cart show
//!
//! # Account
//! tamarind auth login -e you@example.com -p secret
//! tamarind auth whoami
//!
//! # Orders
//! tamarind orders
//! tamarind checkout --email you@example.com --address "1 Main St"
//! ```
//!
//! # Environment Variables
//!
//! - `TAMARIND_API_BASE_URL` - Backend API base URL (required)
//! - `TAMARIND_DATA_DIR` - Directory for persistent local state (optional;
//!   without it the cart, favorites, and session vanish when the process
//!   exits, which makes most commands pointless, so set it)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use url::Url;

use tamarind_storefront::config::ClientConfig;
use tamarind_storefront::AppState;

mod commands;

#[derive(Parser)]
#[command(name = "tamarind")]
#[command(author, version, about = "Tamarind Market storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Free-text search
        #[arg(long)]
        search: Option<String>,
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },
    /// Show one product
    Product {
        /// Product ID
        id: i64,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Fav {
        #[command(subcommand)]
        action: FavAction,
    },
    /// Authentication
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// List your orders
    Orders,
    /// Show one order
    Order {
        /// Order ID
        id: i64,
    },
    /// Submit the cart as an order
    Checkout {
        /// Contact email
        #[arg(long)]
        email: String,
        /// Shipping address
        #[arg(long)]
        address: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: i64,
        /// Quantity to add
        #[arg(long, default_value_t = 1)]
        qty: u32,
        /// Size choice
        #[arg(long)]
        size: Option<String>,
        /// Color choice
        #[arg(long)]
        color: Option<String>,
        /// Variant ID
        #[arg(long)]
        variant: Option<i64>,
    },
    /// Overwrite a line's quantity (0 removes it)
    Set {
        /// Line ID as printed by `cart show`
        line_id: String,
        /// New quantity
        qty: u32,
    },
    /// Remove a line
    Remove {
        /// Line ID as printed by `cart show`
        line_id: String,
    },
    /// Empty the cart (locally and, when logged in, on the server)
    Clear,
}

#[derive(Subcommand)]
enum FavAction {
    /// Print the favorites
    List,
    /// Toggle a product's favorited state
    Toggle {
        /// Product ID
        product_id: i64,
    },
    /// Remove all favorites
    Clear,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Log in with credentials
    Login {
        /// Email address
        #[arg(short, long)]
        email: String,
        /// Password
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Email address
        #[arg(short, long)]
        email: String,
        /// Password
        #[arg(short, long)]
        password: String,
    },
    /// Print the Google OAuth entry URL
    GoogleUrl,
    /// Complete an OAuth flow with the callback URL the browser landed on
    Oauth {
        /// Full callback URL (carries the token as a query parameter)
        callback_url: Url,
    },
    /// Log out and erase local user state
    Logout,
    /// Show the current session
    Whoami,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let state = AppState::new(config)?;
    state.start_watchers();

    match cli.command {
        Commands::Products {
            page,
            search,
            category,
        } => commands::catalog::list(&state, page, search, category).await?,
        Commands::Product { id } => commands::catalog::show(&state, id).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state),
            CartAction::Add {
                product_id,
                qty,
                size,
                color,
                variant,
            } => commands::cart::add(&state, product_id, qty, size, color, variant).await?,
            CartAction::Set { line_id, qty } => commands::cart::set(&state, &line_id, qty),
            CartAction::Remove { line_id } => commands::cart::set(&state, &line_id, 0),
            CartAction::Clear => commands::cart::clear(&state).await,
        },
        Commands::Fav { action } => match action {
            FavAction::List => commands::favorites::list(&state),
            FavAction::Toggle { product_id } => {
                commands::favorites::toggle(&state, product_id).await?;
            }
            FavAction::Clear => commands::favorites::clear(&state).await,
        },
        Commands::Auth { action } => match action {
            AuthAction::Login { email, password } => {
                commands::auth::login(&state, email, password).await?;
            }
            AuthAction::Register {
                name,
                email,
                password,
            } => commands::auth::register(&state, name, email, password).await?,
            AuthAction::GoogleUrl => commands::auth::google_url(&state)?,
            AuthAction::Oauth { callback_url } => {
                commands::auth::complete_oauth(&state, &callback_url).await?;
            }
            AuthAction::Logout => commands::auth::logout(&state),
            AuthAction::Whoami => commands::auth::whoami(&state),
        },
        Commands::Orders => commands::orders::list(&state).await?,
        Commands::Order { id } => commands::orders::show(&state, id).await?,
        Commands::Checkout { email, address } => {
            commands::orders::checkout(&state, email, address).await?;
        }
    }

    // Give fire-and-forget remote mirror calls a moment to land before the
    // process exits; they are best-effort either way.
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    Ok(())
}

//! Backend REST API client.
//!
//! # Architecture
//!
//! - The backend is the remote source of truth for the catalog, orders, and
//!   the authenticated user's cart/favorites collections
//! - Catalog reads are cached in-memory via `moka` (5 minute TTL); cart,
//!   favorites, and orders are never cached (mutable state)
//! - The seams the synchronizers depend on ([`CartApi`], [`FavoritesApi`],
//!   [`AuthApi`]) are traits, so tests inject recording mocks instead of a
//!   live client
//!
//! # Session invalidation
//!
//! Every authenticated call carries the bearer token read from the shared
//! [`SessionHandle`]. An HTTP 401 from *any* call is not treated as that
//! call's private failure: it is broadcast on a process-wide channel so the
//! session layer tears the session down once, instead of the app limping on
//! with a dead token.

mod cache;
#[cfg(test)]
pub(crate) mod mock;
pub mod types;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, instrument};
use url::Url;

use tamarind_core::{OrderId, ProductId};

use crate::catalog::ProductQuery;
use crate::config::ClientConfig;
use crate::models::{LineKey, Session, UserProfile};
use crate::session::SessionHandle;

use cache::CacheValue;
use types::{
    CartLinePayload, CheckoutRequest, CheckoutResponse, LineSelector, LoginRequest, Order, Product,
    ProductPage, QuantityUpdate, RegisterRequest, RemoteCartLine, RemoteFavorite,
};

/// Capacity of the unauthorized-signal channel.
const UNAUTHORIZED_CHANNEL_CAPACITY: usize = 16;

/// Errors that can occur when talking to the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (network, timeout, invalid response).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// URL construction failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The bearer token was rejected. The global unauthorized signal has
    /// already been broadcast by the time this is returned.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },
}

/// Marker broadcast when any authenticated call receives HTTP 401.
#[derive(Debug, Clone, Copy)]
pub struct Unauthorized;

// =============================================================================
// Remote seams
// =============================================================================

/// Remote cart collection operations used by the cart synchronizer.
pub trait CartApi: Clone + Send + Sync + 'static {
    /// Fetch the authenticated user's server-side cart lines.
    fn fetch_cart(&self) -> impl Future<Output = Result<Vec<RemoteCartLine>, ApiError>> + Send;

    /// Mirror an optimistic add.
    fn push_cart_add(
        &self,
        line: CartLinePayload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Mirror a quantity overwrite, keyed by product and variant
    /// discriminators (the backend knows nothing of client line IDs).
    fn push_cart_update(
        &self,
        key: LineKey,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Mirror a line removal.
    fn push_cart_remove(&self, key: LineKey) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Delete the entire server-side cart.
    fn push_cart_clear(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Remote favorites collection operations used by the favorites synchronizer.
pub trait FavoritesApi: Clone + Send + Sync + 'static {
    /// Fetch the authenticated user's favorites (authoritative list).
    fn fetch_favorites(&self)
    -> impl Future<Output = Result<Vec<RemoteFavorite>, ApiError>> + Send;

    /// Mirror a favorite toggle-on.
    fn push_favorite_add(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Mirror a favorite toggle-off.
    fn push_favorite_remove(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Delete all server-side favorites.
    fn push_favorites_clear(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Authentication operations used by the session manager.
pub trait AuthApi: Clone + Send + Sync + 'static {
    /// Exchange credentials for an authenticated session.
    fn login(
        &self,
        email: String,
        password: String,
    ) -> impl Future<Output = Result<Session, ApiError>> + Send;

    /// Create an account and return the resulting session.
    fn register(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> impl Future<Output = Result<Session, ApiError>> + Send;

    /// Fetch the profile for a token obtained out-of-band (OAuth callback).
    fn current_user(
        &self,
        token: String,
    ) -> impl Future<Output = Result<UserProfile, ApiError>> + Send;

    /// Subscribe to the process-wide session-invalidation signal.
    fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized>;
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront backend.
///
/// Cheaply cloneable via `Arc`; clones share the HTTP connection pool, the
/// catalog cache, and the unauthorized-signal channel.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    session: SessionHandle,
    unauthorized: broadcast::Sender<Unauthorized>,
    catalog_cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    #[must_use]
    pub fn new(config: &ClientConfig, session: SessionHandle) -> Self {
        let catalog_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        let (unauthorized, _) = broadcast::channel(UNAUTHORIZED_CHANNEL_CAPACITY);

        // Relative joins in `url()` drop the last path segment unless the
        // base path ends with a slash.
        let mut base_url = config.api_base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url,
                timeout: config.request_timeout,
                session,
                unauthorized,
                catalog_cache,
            }),
        }
    }

    /// Build the absolute URL for an API path.
    ///
    /// Paths are joined relative to the base so a path prefix in the
    /// configured base URL (e.g. `https://host/api/`) is preserved.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the path cannot be joined onto the
    /// configured base URL.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Start a request, attaching the bearer token when a session exists.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .timeout(self.inner.timeout);
        if let Some(token) = self.inner.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send a request and map the response status to `ApiError`.
    ///
    /// A 401 broadcasts the process-wide unauthorized signal before
    /// returning; see the module docs.
    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<reqwest::Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path, "Backend rejected bearer token; signaling session invalidation");
            let _ = self.inner.unauthorized.send(Unauthorized);
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_owned()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path,
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }

    /// Send a request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(builder, path).await?;
        // Read the body as text first for better parse-error diagnostics.
        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    path,
                    error = %e,
                    body = %text.chars().take(500).collect::<String>(),
                    "Failed to parse backend response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    /// Send a request, discarding any response body.
    async fn send_unit(&self, builder: RequestBuilder, path: &str) -> Result<(), ApiError> {
        self.send(builder, path).await.map(|_| ())
    }

    // =========================================================================
    // Catalog (cached)
    // =========================================================================

    /// Get a page of the product list.
    ///
    /// Pages without a search term are cached; search results are not.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let cache_key = query.cache_key();

        if query.search.is_none()
            && let Some(CacheValue::Products(page)) =
                self.inner.catalog_cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let url = self.url("/products")?;
        let builder = self.request(Method::GET, url).query(query);
        let page: ProductPage = self.send_json(builder, "/products").await?;

        if query.search.is_none() {
            self.inner
                .catalog_cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.catalog_cache.get(&cache_key).await
        {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{product_id}");
        let url = self.url(&path)?;
        let product: Product = self.send_json(self.request(Method::GET, url), &path).await?;

        self.inner
            .catalog_cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_catalog(&self) {
        self.inner.catalog_cache.invalidate_all();
        self.inner.catalog_cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Orders & checkout (not cached - mutable state)
    // =========================================================================

    /// List the authenticated user's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is rejected.
    #[instrument(skip(self))]
    pub async fn get_orders(&self) -> Result<Vec<Order>, ApiError> {
        let url = self.url("/orders")?;
        self.send_json(self.request(Method::GET, url), "/orders").await
    }

    /// Get a single order with its payment status.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, ApiError> {
        let path = format!("/orders/{order_id}");
        let url = self.url(&path)?;
        self.send_json(self.request(Method::GET, url), &path).await
    }

    /// Submit a checkout, returning the created order ID and the payment
    /// redirect URL for the external payment widget.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self, request))]
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutResponse, ApiError> {
        let url = self.url("/orders")?;
        let builder = self.request(Method::POST, url).json(request);
        self.send_json(builder, "/orders").await
    }

    // =========================================================================
    // OAuth
    // =========================================================================

    /// URL of the redirect-based Google OAuth entry point.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the base URL cannot be extended.
    pub fn google_login_url(&self) -> Result<Url, ApiError> {
        self.url("/auth/google/login")
    }
}

/// Extract the bearer token an OAuth callback redirect carries as a query
/// parameter, if present.
#[must_use]
pub fn token_from_callback(callback_url: &Url) -> Option<String> {
    callback_url
        .query_pairs()
        .find(|(name, _)| name == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Trait implementations
// =============================================================================

impl CartApi for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<Vec<RemoteCartLine>, ApiError> {
        let url = self.url("/cart")?;
        self.send_json(self.request(Method::GET, url), "/cart").await
    }

    #[instrument(skip(self, line))]
    async fn push_cart_add(&self, line: CartLinePayload) -> Result<(), ApiError> {
        let url = self.url("/cart")?;
        let builder = self.request(Method::POST, url).json(&line);
        self.send_unit(builder, "/cart").await
    }

    #[instrument(skip(self, key))]
    async fn push_cart_update(&self, key: LineKey, quantity: u32) -> Result<(), ApiError> {
        let path = format!("/cart/{}", key.product_id);
        let url = self.url(&path)?;
        let builder = self
            .request(Method::PUT, url)
            .query(&LineSelector::from(&key))
            .json(&QuantityUpdate { quantity });
        self.send_unit(builder, &path).await
    }

    #[instrument(skip(self, key))]
    async fn push_cart_remove(&self, key: LineKey) -> Result<(), ApiError> {
        let path = format!("/cart/{}", key.product_id);
        let url = self.url(&path)?;
        let builder = self
            .request(Method::DELETE, url)
            .query(&LineSelector::from(&key));
        self.send_unit(builder, &path).await
    }

    #[instrument(skip(self))]
    async fn push_cart_clear(&self) -> Result<(), ApiError> {
        let url = self.url("/cart")?;
        self.send_unit(self.request(Method::DELETE, url), "/cart").await
    }
}

impl FavoritesApi for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_favorites(&self) -> Result<Vec<RemoteFavorite>, ApiError> {
        let url = self.url("/favorites")?;
        self.send_json(self.request(Method::GET, url), "/favorites").await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn push_favorite_add(&self, product_id: ProductId) -> Result<(), ApiError> {
        let path = format!("/favorites/{product_id}");
        let url = self.url(&path)?;
        self.send_unit(self.request(Method::POST, url), &path).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn push_favorite_remove(&self, product_id: ProductId) -> Result<(), ApiError> {
        let path = format!("/favorites/{product_id}");
        let url = self.url(&path)?;
        self.send_unit(self.request(Method::DELETE, url), &path).await
    }

    #[instrument(skip(self))]
    async fn push_favorites_clear(&self) -> Result<(), ApiError> {
        let url = self.url("/favorites")?;
        self.send_unit(self.request(Method::DELETE, url), "/favorites").await
    }
}

impl AuthApi for ApiClient {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: String, password: String) -> Result<Session, ApiError> {
        let url = self.url("/auth/login")?;
        let builder = self
            .request(Method::POST, url)
            .json(&LoginRequest { email, password });
        self.send_json(builder, "/auth/login").await
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn register(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<Session, ApiError> {
        let url = self.url("/auth/register")?;
        let builder = self.request(Method::POST, url).json(&RegisterRequest {
            name,
            email,
            password,
        });
        self.send_json(builder, "/auth/register").await
    }

    #[instrument(skip(self, token))]
    async fn current_user(&self, token: String) -> Result<UserProfile, ApiError> {
        // The session handle has no token yet during OAuth completion, so
        // the bearer credential is attached explicitly here.
        let url = self.url("/auth/me")?;
        let builder = self
            .inner
            .client
            .get(url)
            .timeout(self.inner.timeout)
            .bearer_auth(token);
        self.send_json(builder, "/auth/me").await
    }

    fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized> {
        self.inner.unauthorized.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_callback() {
        let url = Url::parse("https://shop.example/oauth/callback?token=abc123&state=x").unwrap();
        assert_eq!(token_from_callback(&url).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_from_callback_missing_or_empty() {
        let url = Url::parse("https://shop.example/oauth/callback?state=x").unwrap();
        assert!(token_from_callback(&url).is_none());

        let url = Url::parse("https://shop.example/oauth/callback?token=").unwrap();
        assert!(token_from_callback(&url).is_none());
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let config = crate::config::ClientConfig::new(
            Url::parse("https://shop.example/api").unwrap(),
        );
        let client = ApiClient::new(&config, SessionHandle::default());

        assert_eq!(
            client.url("/cart").unwrap().as_str(),
            "https://shop.example/api/cart"
        );
        assert_eq!(
            client.url("/products/7").unwrap().as_str(),
            "https://shop.example/api/products/7"
        );
    }

    #[test]
    fn test_url_without_base_path() {
        let config = crate::config::ClientConfig::new(
            Url::parse("http://localhost:8000").unwrap(),
        );
        let client = ApiClient::new(&config, SessionHandle::default());

        assert_eq!(
            client.url("/favorites").unwrap().as_str(),
            "http://localhost:8000/favorites"
        );
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            ApiError::NotFound("/products/9".to_owned()).to_string(),
            "Not found: /products/9"
        );
        assert_eq!(
            ApiError::RateLimited(30).to_string(),
            "Rate limited, retry after 30 seconds"
        );
        assert_eq!(
            ApiError::Status {
                status: 502,
                message: "bad gateway".to_owned()
            }
            .to_string(),
            "HTTP 502: bad gateway"
        );
    }
}

//! Integration tests for Tamarind Market.
//!
//! # Running Tests
//!
//! ```bash
//! # Against a live backend
//! TAMARIND_API_BASE_URL=http://localhost:8000 \
//!     cargo test -p tamarind-integration-tests -- --ignored
//!
//! # Offline tests only
//! cargo test -p tamarind-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_live` - End-to-end flows against a running backend
//!   (ignored by default; require `TAMARIND_API_BASE_URL` and a backend
//!   with test accounts enabled)
//! - `storefront_offline` - Full client wiring over the in-memory store,
//!   no network

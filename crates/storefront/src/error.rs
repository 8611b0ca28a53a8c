//! Unified error type for the storefront client.
//!
//! The subsystem errors stay distinct at their seams; this type exists for
//! callers (the CLI, embedders) that thread several subsystems through one
//! `Result` chain.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::session::SessionError;
use crate::store::StoreError;

/// Top-level error for storefront client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Backend API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Local store backend failed to open.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session operation failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Convenience alias for storefront client results.
pub type Result<T> = std::result::Result<T, Error>;

//! Tamarind Core - Shared types library.
//!
//! This crate provides common types used across all Tamarind Market components:
//! - `storefront` - Client core for the customer-facing storefront
//! - `cli` - Command-line front end exercising the storefront operations
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

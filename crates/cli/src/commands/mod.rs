//! CLI command implementations.
//!
//! Command output is the product here, so stdout printing is allowed
//! module-wide; diagnostics still go through `tracing`.

#![allow(clippy::print_stdout)]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod favorites;
pub mod orders;

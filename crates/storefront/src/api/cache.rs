//! Cache value types for catalog responses.

use super::types::{Product, ProductPage};

/// Values stored in the catalog cache.
///
/// Boxed where large so the enum stays small for the common page case.
#[derive(Clone)]
pub(crate) enum CacheValue {
    Products(ProductPage),
    Product(Box<Product>),
}

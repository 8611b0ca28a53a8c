//! Product browsing parameters and image URL normalization.

use serde::Serialize;
use url::Url;

/// Default page size for the product list.
pub const DEFAULT_PER_PAGE: u32 = 24;

/// Query parameters for `GET /products`.
#[derive(Debug, Clone, Serialize)]
pub struct ProductQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            search: None,
            category: None,
        }
    }
}

impl ProductQuery {
    /// Cache key for this query. Search queries are never cached, so the
    /// search term is deliberately absent.
    #[must_use]
    pub(crate) fn cache_key(&self) -> String {
        format!(
            "products:{}:{}:{}",
            self.page,
            self.per_page,
            self.category.as_deref().unwrap_or("")
        )
    }
}

/// Normalize a backend image reference into a fetchable URL.
///
/// The backend is inconsistent about image references: they arrive as bare
/// filenames, `uploads/`-relative paths, or full URLs. Downstream code
/// (cart lines, favorites) stores the normalized result and treats it as an
/// opaque string.
#[must_use]
pub fn normalize_image_url(base: &Url, image_ref: &str) -> String {
    let trimmed = image_ref.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_owned();
    }
    let base = base.as_str().trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("uploads/") {
        return format!("{base}/uploads/{rest}");
    }
    format!("{base}/uploads/{trimmed}")
}

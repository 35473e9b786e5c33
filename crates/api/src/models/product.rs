//! Product domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use mercado_core::{CategoryId, Price, ProductId};

/// A catalog product with its optional image.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Category the product is listed under.
    pub category_id: CategoryId,
    /// Free-form description.
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Units on hand, `None` when stock is not tracked.
    pub stock: Option<i64>,
    /// Stored file name of the product image, relative to the upload directory.
    pub image_path: Option<String>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category_id: CategoryId,
    pub description: String,
    pub price: Price,
    pub stock: Option<i64>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<i64>,
}

/// Product as returned to API clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub category_id: CategoryId,
    pub description: String,
    pub price: Price,
    pub stock: Option<i64>,
    /// Absolute URL of the image, or `null`.
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProductView {
    /// Build the client view, resolving the image path against `base_url`.
    #[must_use]
    pub fn from_product(product: Product, base_url: &Url) -> Self {
        let image_url = product
            .image_path
            .as_deref()
            .and_then(|path| image_url(base_url, path));

        Self {
            id: product.id,
            name: product.name,
            category_id: product.category_id,
            description: product.description,
            price: product.price,
            stock: product.stock,
            image_url,
            created_at: product.created_at,
        }
    }
}

/// `<base>/uploads/<file>` for a stored image.
fn image_url(base_url: &Url, path: &str) -> Option<String> {
    base_url
        .join("uploads/")
        .and_then(|uploads| uploads.join(path))
        .map(String::from)
        .ok()
}

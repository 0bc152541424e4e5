//! Catalog trait: the abstraction over product storage.
//!
//! The catalog store owns categories, products, and the bot's info pages.
//! The admin wizard reads categories and existing products from it and
//! commits finished drafts back into it. Storage internals live in the
//! implementing crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Identifier of a product in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub i64);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to an uploaded image (a transport file id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(pub String);

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A product as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub price: Decimal,
    pub image: ImageRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully assembled product record, ready to be inserted or to replace
/// an existing product's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDraft {
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub price: Decimal,
    pub image: ImageRef,
}

impl From<&Product> for EntityDraft {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            category_id: product.category_id,
            price: product.price,
            image: product.image.clone(),
        }
    }
}

/// A static page of the bot (main, about, payment, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoPage {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

/// The core CatalogStore trait.
///
/// Implementations: in-memory (seeded from config), and test doubles.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// All categories, in display order.
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// Products belonging to one category, in insertion order.
    async fn list_products(&self, category: CategoryId) -> Result<Vec<Product>, CatalogError>;

    /// Fetch one product. Unknown ids yield `CatalogError::NotFound`.
    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Insert a new product and return its id.
    async fn insert_product(&self, draft: EntityDraft) -> Result<ProductId, CatalogError>;

    /// Replace every field of an existing product.
    async fn update_product(&self, id: ProductId, draft: EntityDraft) -> Result<(), CatalogError>;

    /// Remove a product.
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError>;

    /// All info pages.
    async fn list_info_pages(&self) -> Result<Vec<InfoPage>, CatalogError>;
}

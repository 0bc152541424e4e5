//! In-memory catalog, seeded from config and lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use shopwright_config::StoreConfig;
use shopwright_core::catalog::{
    CatalogStore, Category, CategoryId, EntityDraft, InfoPage, Product, ProductId,
};
use shopwright_core::error::CatalogError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    /// Keyed by id, so iteration follows insertion order.
    products: BTreeMap<ProductId, Product>,
    info_pages: Vec<InfoPage>,
    next_product_id: i64,
}

/// A catalog that keeps every table in process memory.
pub struct InMemoryCatalog {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryCatalog {
    /// An empty catalog: no categories, no products, no pages.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables {
                next_product_id: 1,
                ..Tables::default()
            })),
        }
    }

    /// A catalog seeded with the configured categories and info pages.
    /// Category ids are assigned from 1 in configured order.
    pub fn seeded(config: &StoreConfig) -> Self {
        let categories = config
            .categories
            .iter()
            .enumerate()
            .map(|(i, name)| Category {
                id: CategoryId(i as i64 + 1),
                name: name.clone(),
            })
            .collect();
        let info_pages = config
            .info_pages
            .iter()
            .map(|(name, description)| InfoPage {
                name: name.clone(),
                description: description.clone(),
                image: None,
            })
            .collect();

        Self {
            tables: Arc::new(RwLock::new(Tables {
                categories,
                products: BTreeMap::new(),
                info_pages,
                next_product_id: 1,
            })),
        }
    }

    /// Add a category at the end of the display order.
    pub async fn add_category(&self, name: &str) -> CategoryId {
        let mut tables = self.tables.write().await;
        let id = CategoryId(tables.categories.iter().map(|c| c.id.0).max().unwrap_or(0) + 1);
        tables.categories.push(Category {
            id,
            name: name.into(),
        });
        id
    }

    /// Remove a category. Products keep their dangling category id.
    pub async fn remove_category(&self, id: CategoryId) -> bool {
        let mut tables = self.tables.write().await;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        tables.categories.len() < before
    }

    /// Total number of products.
    pub async fn product_count(&self) -> usize {
        self.tables.read().await.products.len()
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_category(tables: &Tables, id: CategoryId) -> Result<(), CatalogError> {
    if tables.categories.iter().any(|c| c.id == id) {
        Ok(())
    } else {
        Err(CatalogError::Conflict(format!("category {id} does not exist")))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.tables.read().await.categories.clone())
    }

    async fn list_products(&self, category: CategoryId) -> Result<Vec<Product>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| p.category_id == category)
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.tables
            .read()
            .await
            .products
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound { id: id.0 })
    }

    async fn insert_product(&self, draft: EntityDraft) -> Result<ProductId, CatalogError> {
        let mut tables = self.tables.write().await;
        ensure_category(&tables, draft.category_id)?;

        let id = ProductId(tables.next_product_id);
        tables.next_product_id += 1;
        let now = Utc::now();
        tables.products.insert(
            id,
            Product {
                id,
                name: draft.name,
                description: draft.description,
                category_id: draft.category_id,
                price: draft.price,
                image: draft.image,
                created_at: now,
                updated_at: now,
            },
        );
        debug!(product_id = %id, "Product inserted");
        Ok(id)
    }

    async fn update_product(&self, id: ProductId, draft: EntityDraft) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        ensure_category(&tables, draft.category_id)?;

        let product = tables
            .products
            .get_mut(&id)
            .ok_or(CatalogError::NotFound { id: id.0 })?;
        product.name = draft.name;
        product.description = draft.description;
        product.category_id = draft.category_id;
        product.price = draft.price;
        product.image = draft.image;
        product.updated_at = Utc::now();
        debug!(product_id = %id, "Product updated");
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        match tables.products.remove(&id) {
            Some(_) => {
                debug!(product_id = %id, "Product deleted");
                Ok(())
            }
            None => Err(CatalogError::NotFound { id: id.0 }),
        }
    }

    async fn list_info_pages(&self) -> Result<Vec<InfoPage>, CatalogError> {
        Ok(self.tables.read().await.info_pages.clone())
    }
}

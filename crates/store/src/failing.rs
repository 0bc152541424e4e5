//! Fault-injecting catalog wrapper. Delegates to an inner store but fails
//! selected operations on demand. Used to exercise store-error paths.

use async_trait::async_trait;
use shopwright_core::catalog::{
    CatalogStore, Category, CategoryId, EntityDraft, InfoPage, Product, ProductId,
};
use shopwright_core::error::CatalogError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Which operations should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FailureMode {
    /// Delegate everything
    None = 0,
    /// Fail inserts, updates and deletes
    Writes = 1,
    /// Fail category listing
    Categories = 2,
    /// Fail every operation
    All = 3,
}

impl FailureMode {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => FailureMode::Writes,
            2 => FailureMode::Categories,
            3 => FailureMode::All,
            _ => FailureMode::None,
        }
    }
}

pub struct FailingCatalog {
    inner: Arc<dyn CatalogStore>,
    mode: AtomicU8,
}

impl FailingCatalog {
    pub fn new(inner: Arc<dyn CatalogStore>, mode: FailureMode) -> Self {
        Self {
            inner,
            mode: AtomicU8::new(mode as u8),
        }
    }

    pub fn set_mode(&self, mode: FailureMode) {
        self.mode.store(mode as u8, Ordering::SeqCst);
    }

    pub fn mode(&self) -> FailureMode {
        FailureMode::from_u8(self.mode.load(Ordering::SeqCst))
    }

    fn check_write(&self) -> Result<(), CatalogError> {
        match self.mode() {
            FailureMode::Writes | FailureMode::All => {
                Err(CatalogError::Storage("database is read-only".into()))
            }
            _ => Ok(()),
        }
    }

    fn check_read(&self) -> Result<(), CatalogError> {
        match self.mode() {
            FailureMode::All => Err(CatalogError::Storage("database unavailable".into())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogStore for FailingCatalog {
    fn name(&self) -> &str { "failing" }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        if matches!(self.mode(), FailureMode::Categories | FailureMode::All) {
            return Err(CatalogError::Storage("category table unavailable".into()));
        }
        self.inner.list_categories().await
    }

    async fn list_products(&self, category: CategoryId) -> Result<Vec<Product>, CatalogError> {
        self.check_read()?;
        self.inner.list_products(category).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.check_read()?;
        self.inner.get_product(id).await
    }

    async fn insert_product(&self, draft: EntityDraft) -> Result<ProductId, CatalogError> {
        self.check_write()?;
        self.inner.insert_product(draft).await
    }

    async fn update_product(&self, id: ProductId, draft: EntityDraft) -> Result<(), CatalogError> {
        self.check_write()?;
        self.inner.update_product(id, draft).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        self.check_write()?;
        self.inner.delete_product(id).await
    }

    async fn list_info_pages(&self) -> Result<Vec<InfoPage>, CatalogError> {
        self.check_read()?;
        self.inner.list_info_pages().await
    }
}

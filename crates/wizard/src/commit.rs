//! Turns a finished session into one catalog write.

use std::collections::HashMap;
use std::sync::Arc;

use shopwright_core::catalog::{CatalogStore, EntityDraft, ProductId};
use tracing::{info, warn};

use crate::error::WizardError;
use crate::overlay::EditOverlay;
use crate::steps::StepId;
use crate::validation::FieldValue;

/// What the catalog did with the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitReceipt {
    Inserted(ProductId),
    Updated(ProductId),
}

impl CommitReceipt {
    pub fn product_id(&self) -> ProductId {
        match self {
            CommitReceipt::Inserted(id) | CommitReceipt::Updated(id) => *id,
        }
    }
}

pub struct CommitCoordinator {
    store: Arc<dyn CatalogStore>,
}

impl CommitCoordinator {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Build a draft from accumulated field values.
    ///
    /// Fails with `Incomplete` naming the first step whose value is
    /// missing or of the wrong kind.
    pub fn assemble(fields: &HashMap<StepId, FieldValue>) -> Result<EntityDraft, WizardError> {
        let text = |step| match fields.get(&step) {
            Some(FieldValue::Text(s)) => Ok(s.clone()),
            _ => Err(WizardError::Incomplete(step)),
        };
        let name = text(StepId::Name)?;
        let description = text(StepId::Description)?;
        let category_id = match fields.get(&StepId::Category) {
            Some(FieldValue::Category(id)) => *id,
            _ => return Err(WizardError::Incomplete(StepId::Category)),
        };
        let price = match fields.get(&StepId::Price) {
            Some(FieldValue::Price(p)) => *p,
            _ => return Err(WizardError::Incomplete(StepId::Price)),
        };
        let image = match fields.get(&StepId::Image) {
            Some(FieldValue::Image(img)) => img.clone(),
            _ => return Err(WizardError::Incomplete(StepId::Image)),
        };

        Ok(EntityDraft {
            name,
            description,
            category_id,
            price,
            image,
        })
    }

    /// Insert the draft, or update the overlaid product when editing.
    pub async fn commit(
        &self,
        fields: &HashMap<StepId, FieldValue>,
        overlay: Option<&EditOverlay>,
    ) -> Result<CommitReceipt, WizardError> {
        let draft = Self::assemble(fields)?;

        let result = match overlay {
            Some(overlay) => {
                let id = overlay.product_id();
                self.store
                    .update_product(id, draft)
                    .await
                    .map(|()| CommitReceipt::Updated(id))
            }
            None => self
                .store
                .insert_product(draft)
                .await
                .map(CommitReceipt::Inserted),
        };

        match result {
            Ok(receipt) => {
                info!(product_id = %receipt.product_id(), store = self.store.name(), "Draft committed");
                Ok(receipt)
            }
            Err(e) => {
                warn!(error = %e, store = self.store.name(), "Commit failed");
                Err(WizardError::Store(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shopwright_config::StoreConfig;
    use shopwright_core::catalog::{CategoryId, ImageRef, Product};
    use shopwright_store::{FailingCatalog, FailureMode, InMemoryCatalog};

    fn complete_fields() -> HashMap<StepId, FieldValue> {
        HashMap::from([
            (StepId::Name, FieldValue::Text("Margherita".into())),
            (StepId::Description, FieldValue::Text("Tomato and cheese".into())),
            (StepId::Category, FieldValue::Category(CategoryId(1))),
            (StepId::Price, FieldValue::Price(Decimal::new(950, 2))),
            (StepId::Image, FieldValue::Image(ImageRef("photo".into()))),
        ])
    }

    fn seeded() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::seeded(&StoreConfig::default()))
    }

    #[test]
    fn assemble_complete_draft() {
        let draft = CommitCoordinator::assemble(&complete_fields()).unwrap();
        assert_eq!(draft.name, "Margherita");
        assert_eq!(draft.category_id, CategoryId(1));
        assert_eq!(draft.price, Decimal::new(950, 2));
    }

    #[test]
    fn assemble_reports_first_missing_field() {
        let mut fields = complete_fields();
        fields.remove(&StepId::Price);
        fields.remove(&StepId::Image);
        assert!(matches!(
            CommitCoordinator::assemble(&fields),
            Err(WizardError::Incomplete(StepId::Price))
        ));
    }

    #[test]
    fn assemble_rejects_wrong_kind() {
        let mut fields = complete_fields();
        fields.insert(StepId::Category, FieldValue::Text("Food".into()));
        assert!(matches!(
            CommitCoordinator::assemble(&fields),
            Err(WizardError::Incomplete(StepId::Category))
        ));
    }

    #[tokio::test]
    async fn commit_without_overlay_inserts() {
        let store = seeded();
        let coordinator = CommitCoordinator::new(store.clone());
        let receipt = coordinator.commit(&complete_fields(), None).await.unwrap();
        assert_eq!(receipt, CommitReceipt::Inserted(ProductId(1)));
        assert_eq!(store.product_count().await, 1);
    }

    #[tokio::test]
    async fn commit_with_overlay_updates() {
        let store = seeded();
        let id = store
            .insert_product(CommitCoordinator::assemble(&complete_fields()).unwrap())
            .await
            .unwrap();
        let overlay = EditOverlay::capture(store.get_product(id).await.unwrap());

        let mut fields = complete_fields();
        fields.insert(StepId::Name, FieldValue::Text("Marinara".into()));
        let coordinator = CommitCoordinator::new(store.clone());
        let receipt = coordinator.commit(&fields, Some(&overlay)).await.unwrap();

        assert_eq!(receipt, CommitReceipt::Updated(id));
        assert_eq!(store.get_product(id).await.unwrap().name, "Marinara");
        assert_eq!(store.product_count().await, 1);
    }

    #[tokio::test]
    async fn store_failure_is_returned() {
        let store = Arc::new(FailingCatalog::new(seeded(), FailureMode::Writes));
        let coordinator = CommitCoordinator::new(store);
        let err = coordinator.commit(&complete_fields(), None).await.unwrap_err();
        assert!(matches!(err, WizardError::Store(_)));
    }

    #[tokio::test]
    async fn updating_a_vanished_product_fails() {
        let store = seeded();
        let now = Utc::now();
        let overlay = EditOverlay::capture(Product {
            id: ProductId(77),
            name: "Gone".into(),
            description: "Deleted meanwhile".into(),
            category_id: CategoryId(1),
            price: Decimal::ONE,
            image: ImageRef("x".into()),
            created_at: now,
            updated_at: now,
        });
        let coordinator = CommitCoordinator::new(store);
        let err = coordinator
            .commit(&complete_fields(), Some(&overlay))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("77"));
    }
}

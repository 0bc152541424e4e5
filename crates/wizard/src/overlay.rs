//! Snapshot of the product being edited.
//!
//! Captured once when an edit starts and owned by exactly one session.
//! It supplies a step's value when the operator chooses to keep it.

use shopwright_core::catalog::{Product, ProductId};

use crate::steps::StepId;
use crate::validation::FieldValue;

#[derive(Debug, Clone, PartialEq)]
pub struct EditOverlay {
    product: Product,
}

impl EditOverlay {
    pub fn capture(product: Product) -> Self {
        Self { product }
    }

    pub fn product_id(&self) -> ProductId {
        self.product.id
    }

    pub fn snapshot(&self) -> &Product {
        &self.product
    }

    /// The stored value for `step`.
    pub fn value_for(&self, step: StepId) -> FieldValue {
        let p = &self.product;
        match step {
            StepId::Name => FieldValue::Text(p.name.clone()),
            StepId::Description => FieldValue::Text(p.description.clone()),
            StepId::Category => FieldValue::Category(p.category_id),
            StepId::Price => FieldValue::Price(p.price),
            StepId::Image => FieldValue::Image(p.image.clone()),
        }
    }

    /// Short human-readable form of the stored value, for prompts.
    pub fn describe(&self, step: StepId) -> String {
        let p = &self.product;
        match step {
            StepId::Name => p.name.clone(),
            StepId::Description => truncate(&p.description, 60),
            StepId::Category => format!("category #{}", p.category_id),
            StepId::Price => p.price.round_dp(2).to_string(),
            StepId::Image => "the current photo".into(),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars).collect();
    format!("{head}…")
}

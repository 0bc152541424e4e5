//! Catalog store implementations for Shopwright.

pub mod in_memory;
pub mod failing;

pub use in_memory::InMemoryCatalog;
pub use failing::{FailingCatalog, FailureMode};

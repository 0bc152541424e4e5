//! Errors a wizard turn can end with.
//!
//! All of them are scoped to one conversation and reported back to the
//! operator as reply text. None is fatal to the process.

use shopwright_core::catalog::ProductId;
use shopwright_core::error::CatalogError;
use thiserror::Error;

use crate::steps::StepId;
use crate::validation::{FieldError, SelectionError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("Already at the first step")]
    AtFirstStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Product {0} not found")]
    NotFound(ProductId),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Store(#[from] CatalogError),

    #[error("A wizard is already running in this conversation")]
    AlreadyActive,

    #[error("No wizard is running in this conversation")]
    NoSession,

    #[error("No value recorded for step {0}")]
    Incomplete(StepId),
}

impl From<FieldError> for WizardError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::Invalid(e) => WizardError::Validation(e),
            FieldError::Selection(e) => WizardError::Selection(e),
        }
    }
}

impl WizardError {
    /// Whether the session survives this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WizardError::Validation(_)
                | WizardError::Selection(_)
                | WizardError::Navigation(_)
                | WizardError::AlreadyActive
        )
    }
}

//! Conversational product wizard for Shopwright.
//!
//! An operator creates or edits a catalog product one field per turn:
//! name, description, category, price, image. Each conversation owns its
//! own session, so any number of operators can run wizards at once.
//!
//! ```text
//! WizardEvent ──▶ WizardController ──▶ SessionStore (per-key lock)
//!                      │    ├──▶ StepRegistry / validation
//!                      │    └──▶ EditOverlay (keep values)
//!                      └──▶ CommitCoordinator ──▶ CatalogStore
//! ```

pub mod commit;
pub mod controller;
pub mod error;
pub mod overlay;
pub mod session;
pub mod steps;
pub mod texts;
pub mod validation;

pub use commit::{CommitCoordinator, CommitReceipt};
pub use controller::{Frame, Outcome, Reply, StartMode, Turn, WizardController, WizardEvent};
pub use error::{NavigationError, WizardError};
pub use overlay::EditOverlay;
pub use session::{Session, SessionGuard, SessionStore};
pub use steps::{Step, StepId, StepRegistry};
pub use validation::{FieldError, FieldValue, SelectionError, ValidationError, WizardInput};

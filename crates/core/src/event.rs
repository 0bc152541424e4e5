//! Domain events published by the wizard and the session store.
//!
//! Events are published when a wizard session changes state. Other
//! components (audit logs, tests, the CLI) can subscribe without tight
//! coupling to the controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A wizard session began
    WizardStarted {
        conversation_id: String,
        /// "create" or "edit"
        mode: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_id: Option<i64>,
        timestamp: DateTime<Utc>,
    },

    /// A step accepted its input and the session moved on
    StepAnswered {
        conversation_id: String,
        step: String,
        kept_previous: bool,
        timestamp: DateTime<Utc>,
    },

    /// A step rejected its input
    InputRejected {
        conversation_id: String,
        step: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The operator went back one step
    SteppedBack {
        conversation_id: String,
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
    },

    /// A draft was written to the catalog
    ProductCommitted {
        conversation_id: String,
        product_id: i64,
        updated: bool,
        timestamp: DateTime<Utc>,
    },

    /// The catalog refused a draft
    CommitFailed {
        conversation_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The wizard ended early because the catalog could not be read
    WizardAborted {
        conversation_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The operator cancelled the wizard
    WizardCancelled {
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An idle session was dropped by the sweeper
    SessionEvicted {
        conversation_id: String,
        was_active: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

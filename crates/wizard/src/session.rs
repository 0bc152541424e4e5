//! Per-conversation wizard state, keyed by conversation id.
//!
//! Every conversation owns one `Session` behind its own async mutex, so
//! events for one conversation run strictly one at a time while distinct
//! conversations proceed in parallel. The map lock is held only long
//! enough to find or insert a slot, never across a handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shopwright_core::event::{DomainEvent, EventBus};
use shopwright_core::message::ConversationId;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::overlay::EditOverlay;
use crate::steps::StepId;
use crate::validation::FieldValue;

/// Wizard state of one conversation.
#[derive(Debug, Clone)]
pub struct Session {
    /// `None` means no wizard is running
    cursor: Option<StepId>,
    fields: HashMap<StepId, FieldValue>,
    overlay: Option<EditOverlay>,
    last_activity: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            cursor: None,
            fields: HashMap::new(),
            overlay: None,
            last_activity: Instant::now(),
        }
    }

    pub fn current_step(&self) -> Option<StepId> {
        self.cursor
    }

    pub fn is_active(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn fields(&self) -> &HashMap<StepId, FieldValue> {
        &self.fields
    }

    pub fn value(&self, step: StepId) -> Option<&FieldValue> {
        self.fields.get(&step)
    }

    pub fn overlay(&self) -> Option<&EditOverlay> {
        self.overlay.as_ref()
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub(crate) fn begin(&mut self, first: StepId, overlay: Option<EditOverlay>) {
        self.fields.clear();
        self.overlay = overlay;
        self.cursor = Some(first);
    }

    pub(crate) fn record(&mut self, step: StepId, value: FieldValue) {
        self.fields.insert(step, value);
    }

    pub(crate) fn move_to(&mut self, step: StepId) {
        self.cursor = Some(step);
    }

    /// Back to "no wizard": values and overlay are dropped.
    pub(crate) fn terminate(&mut self) {
        self.cursor = None;
        self.fields.clear();
        self.overlay = None;
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Exclusive access to one conversation's session.
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Keyed storage of sessions with per-key serialized access.
pub struct SessionStore {
    slots: RwLock<HashMap<ConversationId, Arc<Mutex<Session>>>>,
    idle_timeout: Option<Duration>,
    events: Option<Arc<EventBus>>,
}

impl SessionStore {
    /// A store that never evicts running wizards.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            idle_timeout: None,
            events: None,
        }
    }

    /// Drop sessions untouched for longer than `timeout` when swept.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Publish `SessionEvicted` events on this bus.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Lock the session of `id`, creating an idle one if none exists.
    /// Waits while another event for the same conversation is in flight.
    pub async fn acquire(&self, id: &ConversationId) -> SessionGuard {
        let existing = self.slots.read().await.get(id).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => self
                .slots
                .write()
                .await
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
                .clone(),
        };
        slot.lock_owned().await
    }

    /// Lock the session of `id` only if one exists. Never creates state.
    pub async fn acquire_existing(&self, id: &ConversationId) -> Option<SessionGuard> {
        let slot = self.slots.read().await.get(id).cloned()?;
        Some(slot.lock_owned().await)
    }

    /// Whether `id` currently has a running wizard.
    pub async fn is_active(&self, id: &ConversationId) -> bool {
        match self.acquire_existing(id).await {
            Some(session) => session.is_active(),
            None => false,
        }
    }

    /// A copy of the session of `id`, if one exists.
    pub async fn snapshot(&self, id: &ConversationId) -> Option<Session> {
        self.acquire_existing(id).await.map(|s| s.clone())
    }

    /// Number of tracked conversations.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    /// Remove the slot of `id` when it holds no running wizard and no other
    /// handler holds or awaits it.
    pub async fn discard_if_inactive(&self, id: &ConversationId) -> bool {
        let mut slots = self.slots.write().await;
        let removable = slots.get(id).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|session| !session.is_active())
        });
        if removable {
            slots.remove(id);
            debug!(conversation_id = %id, "Released conversation slot");
        }
        removable
    }

    /// Drop sessions nobody is using that have been idle too long.
    ///
    /// Slots without a running wizard are dropped whenever unused; running
    /// wizards only once they exceed the idle timeout. A slot that is
    /// locked or awaited by a handler is never touched.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut evicted = Vec::new();
        {
            let mut slots = self.slots.write().await;
            slots.retain(|id, slot| {
                // Someone outside the map holds or awaits this slot
                if Arc::strong_count(slot) > 1 {
                    return true;
                }
                let Ok(session) = slot.try_lock() else {
                    return true;
                };
                if session.is_active() {
                    let expired = self
                        .idle_timeout
                        .is_some_and(|t| now.duration_since(session.last_activity) >= t);
                    if !expired {
                        return true;
                    }
                }
                evicted.push((id.clone(), session.is_active()));
                false
            });
        }

        for (id, was_active) in &evicted {
            if *was_active {
                info!(conversation_id = %id, "Evicted idle wizard session");
            } else {
                debug!(conversation_id = %id, "Dropped idle conversation slot");
            }
            if let Some(events) = &self.events {
                events.publish(DomainEvent::SessionEvicted {
                    conversation_id: id.to_string(),
                    was_active: *was_active,
                    timestamp: Utc::now(),
                });
            }
        }
        evicted.len()
    }

    /// Run [`evict_idle`](Self::evict_idle) every `every` until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let evicted = self.evict_idle().await;
                if evicted > 0 {
                    debug!(evicted, "Session sweep finished");
                }
            }
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

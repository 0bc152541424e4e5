//! The wizard state machine.
//!
//! One [`WizardEvent`] in, one [`Turn`] out. Each turn locks the
//! conversation's session for its whole duration, including catalog
//! calls, so events of one conversation never interleave while other
//! conversations keep running.

use std::sync::Arc;

use chrono::Utc;
use shopwright_config::WizardConfig;
use shopwright_core::catalog::{CatalogStore, Category, ProductId};
use shopwright_core::error::CatalogError;
use shopwright_core::event::{DomainEvent, EventBus};
use shopwright_core::message::{Choice, ConversationId};
use tracing::{debug, info, warn};

use crate::commit::{CommitCoordinator, CommitReceipt};
use crate::error::{NavigationError, WizardError};
use crate::overlay::EditOverlay;
use crate::session::{Session, SessionStore};
use crate::steps::{StepId, StepRegistry};
use crate::texts;
use crate::validation::{self, FieldError, ValidationContext, WizardInput};

/// How a wizard is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Create,
    /// Edit an existing product, keeping its values on request
    Edit(ProductId),
}

impl StartMode {
    fn as_str(self) -> &'static str {
        match self {
            StartMode::Create => "create",
            StartMode::Edit(_) => "edit",
        }
    }
}

/// Inbound events, already normalized by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    Start(StartMode),
    Input(WizardInput),
    Back,
    Cancel,
}

/// Where a reply sits in the wizard's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// First prompt of a new wizard
    Opening,
    /// A prompt or error while the wizard keeps running
    Ongoing,
    /// The wizard has ended
    Closing,
}

/// The outbound effect of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Selectable choices, empty for free-text steps
    pub choices: Vec<Choice>,
    pub frame: Frame,
}

impl Reply {
    fn new(text: impl Into<String>, frame: Frame) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
            frame,
        }
    }
}

/// What a turn did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new wizard is waiting at `step`
    Started(StepId),
    /// The answer was accepted; the wizard now waits at `step`
    Advanced(StepId),
    /// The event was refused; the session is unchanged
    Rejected(WizardError),
    /// The wizard moved back to `step`
    SteppedBack(StepId),
    Committed(CommitReceipt),
    /// The commit failed and the wizard ended anyway
    CommitFailed(WizardError),
    /// A catalog read failed mid-wizard and the wizard ended
    Aborted(WizardError),
    /// No wizard was created
    StartFailed(WizardError),
    Cancelled,
    /// Nothing to act on: no wizard is running
    Ignored,
}

impl Outcome {
    /// Whether the conversation is left without a running wizard.
    pub fn ends_wizard(&self) -> bool {
        matches!(
            self,
            Outcome::Committed(_)
                | Outcome::CommitFailed(_)
                | Outcome::Aborted(_)
                | Outcome::StartFailed(_)
                | Outcome::Cancelled
        )
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub outcome: Outcome,
    /// `None` only when the event had no observable effect
    pub reply: Option<Reply>,
}

impl Turn {
    fn new(outcome: Outcome, reply: Reply) -> Self {
        Self {
            outcome,
            reply: Some(reply),
        }
    }

    fn ignored() -> Self {
        Self {
            outcome: Outcome::Ignored,
            reply: None,
        }
    }
}

/// Drives every conversation's wizard.
pub struct WizardController {
    registry: &'static StepRegistry,
    sessions: Arc<SessionStore>,
    store: Arc<dyn CatalogStore>,
    committer: CommitCoordinator,
    events: Arc<EventBus>,
    keep_token: String,
}

impl WizardController {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        sessions: Arc<SessionStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            registry: StepRegistry::standard(),
            sessions,
            committer: CommitCoordinator::new(store.clone()),
            store,
            events,
            keep_token: WizardConfig::default().keep_token,
        }
    }

    /// Build a controller and its session store from the `[wizard]` section.
    pub fn from_config(
        config: &WizardConfig,
        store: Arc<dyn CatalogStore>,
        events: Arc<EventBus>,
    ) -> Self {
        let sessions = SessionStore::new()
            .with_idle_timeout(config.idle_timeout())
            .with_event_bus(events.clone());
        Self::new(store, Arc::new(sessions), events).with_keep_token(&config.keep_token)
    }

    /// The literal advertised in edit prompts for keeping a value.
    pub fn with_keep_token(mut self, token: &str) -> Self {
        self.keep_token = token.to_string();
        self
    }

    pub fn keep_token(&self) -> &str {
        &self.keep_token
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn registry(&self) -> &'static StepRegistry {
        self.registry
    }

    pub async fn is_active(&self, conversation: &ConversationId) -> bool {
        self.sessions.is_active(conversation).await
    }

    /// Handle one event for `conversation`.
    pub async fn handle(&self, conversation: &ConversationId, event: WizardEvent) -> Turn {
        debug!(conversation_id = %conversation, event = ?event, "Wizard event");
        let turn = match event {
            WizardEvent::Start(mode) => self.start(conversation, mode).await,
            WizardEvent::Input(input) => self.input(conversation, input).await,
            WizardEvent::Back => self.back(conversation).await,
            WizardEvent::Cancel => self.cancel(conversation).await,
        };
        if turn.outcome.ends_wizard() {
            self.sessions.discard_if_inactive(conversation).await;
        }
        turn
    }

    async fn start(&self, conversation: &ConversationId, mode: StartMode) -> Turn {
        let mut session = self.sessions.acquire(conversation).await;
        if session.is_active() {
            return Turn::new(
                Outcome::Rejected(WizardError::AlreadyActive),
                Reply::new(texts::ALREADY_ACTIVE, Frame::Ongoing),
            );
        }

        let overlay = match mode {
            StartMode::Create => None,
            StartMode::Edit(id) => match self.store.get_product(id).await {
                Ok(product) => Some(EditOverlay::capture(product)),
                Err(CatalogError::NotFound { .. }) => {
                    warn!(conversation_id = %conversation, product_id = %id, "Edit target not found");
                    return Turn::new(
                        Outcome::StartFailed(WizardError::NotFound(id)),
                        Reply::new(texts::product_missing(id.0), Frame::Closing),
                    );
                }
                Err(e) => {
                    warn!(conversation_id = %conversation, error = %e, "Could not load edit target");
                    let reply = Reply::new(texts::store_failure(&e.to_string()), Frame::Closing);
                    return Turn::new(Outcome::StartFailed(WizardError::Store(e)), reply);
                }
            },
        };

        let first = self.registry.first();
        session.begin(first, overlay);
        session.touch();
        info!(conversation_id = %conversation, mode = mode.as_str(), "Wizard started");
        self.events.publish(DomainEvent::WizardStarted {
            conversation_id: conversation.to_string(),
            mode: mode.as_str().into(),
            product_id: match mode {
                StartMode::Edit(id) => Some(id.0),
                StartMode::Create => None,
            },
            timestamp: Utc::now(),
        });

        match self.prompt(&session, first, None, false, None).await {
            Ok(mut reply) => {
                reply.frame = Frame::Opening;
                Turn::new(Outcome::Started(first), reply)
            }
            Err(e) => self.abort(conversation, &mut session, e),
        }
    }

    async fn input(&self, conversation: &ConversationId, input: WizardInput) -> Turn {
        let Some(mut session) = self.sessions.acquire_existing(conversation).await else {
            return Turn::ignored();
        };
        let Some(step) = session.current_step() else {
            return Turn::ignored();
        };
        session.touch();

        // Keep never looks at the category list
        let categories = if self.registry.get(step).requires_external_validation
            && input != WizardInput::Keep
        {
            match self.store.list_categories().await {
                Ok(categories) => Some(categories),
                Err(e) => return self.abort(conversation, &mut session, e),
            }
        } else {
            None
        };

        let ctx = ValidationContext {
            overlay: session.overlay(),
            categories: categories.as_deref().unwrap_or_default(),
        };
        let value = match validation::validate(self.registry, step, &input, &ctx) {
            Ok(value) => value,
            Err(err) => return self.reject(conversation, &session, step, err, categories).await,
        };

        let kept_previous = input == WizardInput::Keep;
        session.record(step, value);
        debug!(conversation_id = %conversation, step = %step, kept_previous, "Step answered");
        self.events.publish(DomainEvent::StepAnswered {
            conversation_id: conversation.to_string(),
            step: step.to_string(),
            kept_previous,
            timestamp: Utc::now(),
        });

        let Some(next) = self.registry.next(step) else {
            return self.commit(conversation, &mut session).await;
        };
        session.move_to(next);
        match self.prompt(&session, next, None, false, None).await {
            Ok(reply) => Turn::new(Outcome::Advanced(next), reply),
            Err(e) => self.abort(conversation, &mut session, e),
        }
    }

    async fn reject(
        &self,
        conversation: &ConversationId,
        session: &Session,
        step: StepId,
        err: FieldError,
        categories: Option<Vec<Category>>,
    ) -> Turn {
        debug!(conversation_id = %conversation, step = %step, reason = %err, "Input rejected");
        self.events.publish(DomainEvent::InputRejected {
            conversation_id: conversation.to_string(),
            step: step.to_string(),
            reason: err.to_string(),
            timestamp: Utc::now(),
        });

        let lead = err.to_string();
        let err = WizardError::from(err);
        match self.prompt(session, step, Some(&lead), false, categories).await {
            Ok(reply) => Turn::new(Outcome::Rejected(err), reply),
            // The session stays put; only the choice list is missing
            Err(e) => {
                warn!(conversation_id = %conversation, error = %e, "Could not list categories");
                Turn::new(Outcome::Rejected(err), Reply::new(lead, Frame::Ongoing))
            }
        }
    }

    async fn commit(&self, conversation: &ConversationId, session: &mut Session) -> Turn {
        let result = self
            .committer
            .commit(session.fields(), session.overlay())
            .await;
        session.terminate();

        match result {
            Ok(receipt) => {
                let updated = matches!(receipt, CommitReceipt::Updated(_));
                info!(conversation_id = %conversation, product_id = %receipt.product_id(), updated, "Wizard finished");
                self.events.publish(DomainEvent::ProductCommitted {
                    conversation_id: conversation.to_string(),
                    product_id: receipt.product_id().0,
                    updated,
                    timestamp: Utc::now(),
                });
                let text = if updated { texts::MODIFIED } else { texts::ADDED };
                Turn::new(Outcome::Committed(receipt), Reply::new(text, Frame::Closing))
            }
            Err(err) => {
                self.events.publish(DomainEvent::CommitFailed {
                    conversation_id: conversation.to_string(),
                    error_message: err.to_string(),
                    timestamp: Utc::now(),
                });
                let reply = Reply::new(texts::store_failure(&err.to_string()), Frame::Closing);
                Turn::new(Outcome::CommitFailed(err), reply)
            }
        }
    }

    async fn back(&self, conversation: &ConversationId) -> Turn {
        let Some(mut session) = self.sessions.acquire_existing(conversation).await else {
            return Turn::ignored();
        };
        let Some(step) = session.current_step() else {
            return Turn::ignored();
        };
        session.touch();

        let Some(previous) = self.registry.previous(step) else {
            return Turn::new(
                Outcome::Rejected(NavigationError::AtFirstStep.into()),
                Reply::new(texts::NO_PREVIOUS_STEP, Frame::Ongoing),
            );
        };

        session.move_to(previous);
        debug!(conversation_id = %conversation, from = %step, to = %previous, "Stepped back");
        self.events.publish(DomainEvent::SteppedBack {
            conversation_id: conversation.to_string(),
            from: step.to_string(),
            to: previous.to_string(),
            timestamp: Utc::now(),
        });

        match self
            .prompt(&session, previous, Some(texts::BACK_PREFIX), true, None)
            .await
        {
            Ok(reply) => Turn::new(Outcome::SteppedBack(previous), reply),
            Err(e) => self.abort(conversation, &mut session, e),
        }
    }

    async fn cancel(&self, conversation: &ConversationId) -> Turn {
        let Some(mut session) = self.sessions.acquire_existing(conversation).await else {
            return Turn::ignored();
        };
        if !session.is_active() {
            return Turn::ignored();
        }

        session.terminate();
        session.touch();
        info!(conversation_id = %conversation, "Wizard cancelled");
        self.events.publish(DomainEvent::WizardCancelled {
            conversation_id: conversation.to_string(),
            timestamp: Utc::now(),
        });
        Turn::new(Outcome::Cancelled, Reply::new(texts::CANCELLED, Frame::Closing))
    }

    /// End the wizard after a failed catalog read.
    fn abort(&self, conversation: &ConversationId, session: &mut Session, e: CatalogError) -> Turn {
        session.terminate();
        warn!(conversation_id = %conversation, error = %e, "Wizard aborted");
        self.events.publish(DomainEvent::WizardAborted {
            conversation_id: conversation.to_string(),
            error_message: e.to_string(),
            timestamp: Utc::now(),
        });
        let reply = Reply::new(texts::store_failure(&e.to_string()), Frame::Closing);
        Turn::new(Outcome::Aborted(WizardError::Store(e)), reply)
    }

    /// Render the prompt of `step`, preceded by `lead` when given.
    ///
    /// Steps that select from the catalog list their choices, reusing
    /// `categories` when the caller already fetched them.
    async fn prompt(
        &self,
        session: &Session,
        step: StepId,
        lead: Option<&str>,
        returning: bool,
        categories: Option<Vec<Category>>,
    ) -> Result<Reply, CatalogError> {
        let definition = self.registry.get(step);
        let mut text = String::new();
        if let Some(lead) = lead {
            text.push_str(lead);
            text.push('\n');
        }
        text.push_str(if returning {
            definition.reprompt
        } else {
            definition.prompt
        });
        if let Some(overlay) = session.overlay() {
            text.push('\n');
            text.push_str(&texts::keep_hint(&self.keep_token, &overlay.describe(step)));
        }

        let mut reply = Reply::new(text, Frame::Ongoing);
        if definition.requires_external_validation {
            let categories = match categories {
                Some(categories) => categories,
                None => self.store.list_categories().await?,
            };
            reply.choices = categories
                .into_iter()
                .map(|c| Choice::new(c.name, c.id.to_string()))
                .collect();
            if session.overlay().is_some() {
                reply
                    .choices
                    .push(Choice::new(texts::KEEP_BUTTON, texts::KEEP_CALLBACK));
            }
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shopwright_config::StoreConfig;
    use shopwright_core::catalog::{CategoryId, EntityDraft, ImageRef};
    use shopwright_store::{FailingCatalog, FailureMode, InMemoryCatalog};

    use crate::validation::{FieldValue, ValidationError};

    struct Harness {
        controller: WizardController,
        catalog: Arc<InMemoryCatalog>,
        events: Arc<EventBus>,
    }

    fn harness() -> Harness {
        let catalog = Arc::new(InMemoryCatalog::seeded(&StoreConfig::default()));
        let events = Arc::new(EventBus::new(64));
        let controller = WizardController::new(
            catalog.clone(),
            Arc::new(SessionStore::new()),
            events.clone(),
        );
        Harness {
            controller,
            catalog,
            events,
        }
    }

    fn conv(s: &str) -> ConversationId {
        ConversationId::from(s)
    }

    fn text(s: &str) -> WizardEvent {
        WizardEvent::Input(WizardInput::text(s))
    }

    fn choice(s: &str) -> WizardEvent {
        WizardEvent::Input(WizardInput::Choice(s.into()))
    }

    fn photo(id: &str) -> WizardEvent {
        WizardEvent::Input(WizardInput::photo(id))
    }

    fn keep() -> WizardEvent {
        WizardEvent::Input(WizardInput::Keep)
    }

    async fn existing(catalog: &InMemoryCatalog, name: &str, price: Decimal) -> ProductId {
        catalog
            .insert_product(EntityDraft {
                name: name.into(),
                description: format!("{name} description"),
                category_id: CategoryId(2),
                price,
                image: ImageRef(format!("{name}-photo")),
            })
            .await
            .unwrap()
    }

    async fn run(h: &Harness, id: &ConversationId, events: Vec<WizardEvent>) -> Vec<Turn> {
        let mut turns = Vec::new();
        for event in events {
            turns.push(h.controller.handle(id, event).await);
        }
        turns
    }

    async fn fields(h: &Harness, id: &ConversationId) -> std::collections::HashMap<StepId, FieldValue> {
        h.controller
            .sessions()
            .snapshot(id)
            .await
            .unwrap()
            .fields()
            .clone()
    }

    #[tokio::test]
    async fn create_flow_commits_the_inputs() {
        let h = harness();
        let id = conv("chat-1");
        let turns = run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                text("Tomato, mozzarella, basil"),
                choice("1"),
                text("9.50"),
                photo("file-42"),
            ],
        )
        .await;

        let outcomes: Vec<_> = turns.iter().map(|t| t.outcome.clone()).collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Started(StepId::Name),
                Outcome::Advanced(StepId::Description),
                Outcome::Advanced(StepId::Category),
                Outcome::Advanced(StepId::Price),
                Outcome::Advanced(StepId::Image),
                Outcome::Committed(CommitReceipt::Inserted(ProductId(1))),
            ]
        );

        let product = h.catalog.get_product(ProductId(1)).await.unwrap();
        assert_eq!(product.name, "Margherita");
        assert_eq!(product.description, "Tomato, mozzarella, basil");
        assert_eq!(product.category_id, CategoryId(1));
        assert_eq!(product.price, Decimal::new(950, 2));
        assert_eq!(product.image, ImageRef("file-42".into()));

        let last = turns.last().unwrap().reply.as_ref().unwrap();
        assert_eq!(last.text, texts::ADDED);
        assert_eq!(last.frame, Frame::Closing);
        assert!(!h.controller.is_active(&id).await);
    }

    #[tokio::test]
    async fn prompts_follow_the_steps() {
        let h = harness();
        let id = conv("chat-1");
        let turns = run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                text("Tomato and cheese"),
            ],
        )
        .await;

        let opening = turns[0].reply.as_ref().unwrap();
        assert_eq!(opening.text, texts::NAME_PROMPT);
        assert_eq!(opening.frame, Frame::Opening);

        let category = turns[2].reply.as_ref().unwrap();
        assert_eq!(category.text, texts::CATEGORY_PROMPT);
        assert_eq!(
            category.choices,
            vec![Choice::new("Food", "1"), Choice::new("Drinks", "2")]
        );
    }

    #[tokio::test]
    async fn back_then_reanswer_reproduces_the_fields() {
        let h = harness();
        let straight = conv("straight");
        let detour = conv("detour");
        let answers = vec![
            WizardEvent::Start(StartMode::Create),
            text("Margherita"),
            text("Tomato and cheese"),
            choice("2"),
        ];
        run(&h, &straight, answers.clone()).await;
        run(&h, &detour, answers).await;

        let turns = run(
            &h,
            &detour,
            vec![WizardEvent::Back, choice("2")],
        )
        .await;
        assert_eq!(turns[0].outcome, Outcome::SteppedBack(StepId::Category));
        assert_eq!(turns[1].outcome, Outcome::Advanced(StepId::Price));

        assert_eq!(fields(&h, &straight).await, fields(&h, &detour).await);
    }

    #[tokio::test]
    async fn back_keeps_the_answer_of_the_step_left() {
        let h = harness();
        let id = conv("chat-1");
        run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                text("Tomato and cheese"),
                WizardEvent::Back,
                WizardEvent::Back,
            ],
        )
        .await;

        let snapshot = h.controller.sessions().snapshot(&id).await.unwrap();
        assert_eq!(snapshot.current_step(), Some(StepId::Name));
        assert_eq!(
            snapshot.value(StepId::Description),
            Some(&FieldValue::Text("Tomato and cheese".into()))
        );
    }

    #[tokio::test]
    async fn back_reply_uses_reprompt() {
        let h = harness();
        let id = conv("chat-1");
        let turns = run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                WizardEvent::Back,
            ],
        )
        .await;
        let reply = turns[2].reply.as_ref().unwrap();
        assert!(reply.text.starts_with(texts::BACK_PREFIX));
        assert!(reply.text.ends_with(texts::NAME_REPROMPT));
    }

    #[tokio::test]
    async fn back_at_first_step_is_refused() {
        let h = harness();
        let id = conv("chat-1");
        let turns = run(&h, &id, vec![WizardEvent::Start(StartMode::Create), WizardEvent::Back]).await;
        assert_eq!(
            turns[1].outcome,
            Outcome::Rejected(WizardError::Navigation(NavigationError::AtFirstStep))
        );
        assert_eq!(turns[1].reply.as_ref().unwrap().text, texts::NO_PREVIOUS_STEP);
        let snapshot = h.controller.sessions().snapshot(&id).await.unwrap();
        assert_eq!(snapshot.current_step(), Some(StepId::Name));
    }

    #[tokio::test]
    async fn cancel_clears_the_session_from_any_step() {
        for answered in 0..5 {
            let h = harness();
            let id = conv("chat-1");
            let answers = vec![
                text("Margherita"),
                text("Tomato and cheese"),
                choice("1"),
                text("9.50"),
            ];
            let mut events = vec![WizardEvent::Start(StartMode::Create)];
            events.extend(answers.into_iter().take(answered));
            run(&h, &id, events).await;

            let turn = h.controller.handle(&id, WizardEvent::Cancel).await;
            assert_eq!(turn.outcome, Outcome::Cancelled);
            assert_eq!(turn.reply.unwrap().text, texts::CANCELLED);

            assert!(!h.controller.is_active(&id).await);
            assert!(h.controller.sessions().snapshot(&id).await.is_none());
        }
    }

    #[tokio::test]
    async fn cancel_without_session_is_a_no_op() {
        let h = harness();
        let mut rx = h.events.subscribe();
        let turn = h.controller.handle(&conv("nobody"), WizardEvent::Cancel).await;
        assert_eq!(turn, Turn { outcome: Outcome::Ignored, reply: None });
        assert!(h.controller.sessions().is_empty().await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn input_and_back_without_session_are_ignored() {
        let h = harness();
        let id = conv("nobody");
        assert_eq!(h.controller.handle(&id, text("hello")).await.outcome, Outcome::Ignored);
        assert_eq!(h.controller.handle(&id, WizardEvent::Back).await.outcome, Outcome::Ignored);
        assert!(h.controller.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn price_validation_holds_the_step() {
        let h = harness();
        let id = conv("chat-1");
        run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                text("Tomato and cheese"),
                choice("1"),
            ],
        )
        .await;

        let turn = h.controller.handle(&id, text("abc")).await;
        assert!(matches!(
            turn.outcome,
            Outcome::Rejected(WizardError::Validation(ValidationError::InvalidPrice(_)))
        ));
        assert!(turn.reply.unwrap().text.ends_with(texts::PRICE_PROMPT));
        let snapshot = h.controller.sessions().snapshot(&id).await.unwrap();
        assert_eq!(snapshot.current_step(), Some(StepId::Price));
        assert!(snapshot.value(StepId::Price).is_none());

        let turn = h.controller.handle(&id, text("9.50")).await;
        assert_eq!(turn.outcome, Outcome::Advanced(StepId::Image));
        assert_eq!(
            fields(&h, &id).await.get(&StepId::Price),
            Some(&FieldValue::Price(Decimal::new(950, 2)))
        );
    }

    #[tokio::test]
    async fn unknown_category_rerenders_choices() {
        let h = harness();
        let id = conv("chat-1");
        run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                text("Tomato and cheese"),
            ],
        )
        .await;

        let turn = h.controller.handle(&id, choice("99")).await;
        assert!(matches!(turn.outcome, Outcome::Rejected(WizardError::Selection(_))));
        let reply = turn.reply.unwrap();
        assert_eq!(reply.choices.len(), 2);
        assert_eq!(reply.frame, Frame::Ongoing);
    }

    #[tokio::test]
    async fn category_list_is_read_at_validation_time() {
        let h = harness();
        let id = conv("chat-1");
        run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                text("Tomato and cheese"),
            ],
        )
        .await;

        let added = h.catalog.add_category("Desserts").await;
        let turn = h.controller.handle(&id, choice(&added.to_string())).await;
        assert_eq!(turn.outcome, Outcome::Advanced(StepId::Price));

        h.catalog.remove_category(CategoryId(1)).await;
        h.controller.handle(&id, WizardEvent::Back).await;
        let turn = h.controller.handle(&id, choice("1")).await;
        assert!(matches!(turn.outcome, Outcome::Rejected(WizardError::Selection(_))));
    }

    #[tokio::test]
    async fn keep_in_create_mode_is_rejected() {
        let h = harness();
        let id = conv("chat-1");
        let turns = run(&h, &id, vec![WizardEvent::Start(StartMode::Create), keep()]).await;
        assert_eq!(
            turns[1].outcome,
            Outcome::Rejected(WizardError::Validation(ValidationError::NothingToKeep))
        );
        assert!(fields(&h, &id).await.is_empty());
    }

    #[tokio::test]
    async fn edit_with_keep_reproduces_the_product() {
        let h = harness();
        let pid = existing(&h.catalog, "Espresso", Decimal::new(250, 2)).await;
        let before = h.catalog.get_product(pid).await.unwrap();
        let id = conv("chat-1");

        let turns = run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Edit(pid)),
                keep(),
                keep(),
                keep(),
                keep(),
                keep(),
            ],
        )
        .await;
        assert_eq!(
            turns.last().unwrap().outcome,
            Outcome::Committed(CommitReceipt::Updated(pid))
        );
        assert_eq!(turns.last().unwrap().reply.as_ref().unwrap().text, texts::MODIFIED);

        let after = h.catalog.get_product(pid).await.unwrap();
        assert_eq!(after.name, before.name);
        assert_eq!(after.description, before.description);
        assert_eq!(after.category_id, before.category_id);
        assert_eq!(after.price, before.price);
        assert_eq!(after.image, before.image);
        assert_eq!(h.catalog.product_count().await, 1);
    }

    #[tokio::test]
    async fn edit_mixes_kept_and_new_values() {
        let h = harness();
        let pid = existing(&h.catalog, "Espresso", Decimal::new(250, 2)).await;
        let id = conv("chat-1");

        run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Edit(pid)),
                text("Double espresso"),
                keep(),
                keep(),
                text("3.20"),
                keep(),
            ],
        )
        .await;

        let after = h.catalog.get_product(pid).await.unwrap();
        assert_eq!(after.name, "Double espresso");
        assert_eq!(after.description, "Espresso description");
        assert_eq!(after.price, Decimal::new(320, 2));
        assert_eq!(after.image, ImageRef("Espresso-photo".into()));
    }

    #[tokio::test]
    async fn edit_prompts_advertise_keep() {
        let h = harness();
        let pid = existing(&h.catalog, "Espresso", Decimal::new(250, 2)).await;
        let id = conv("chat-1");
        let turns = run(
            &h,
            &id,
            vec![WizardEvent::Start(StartMode::Edit(pid)), keep(), keep()],
        )
        .await;

        assert!(turns[0].reply.as_ref().unwrap().text.contains("Espresso"));
        let category = turns[2].reply.as_ref().unwrap();
        assert_eq!(
            category.choices.last(),
            Some(&Choice::new(texts::KEEP_BUTTON, texts::KEEP_CALLBACK))
        );
    }

    #[tokio::test]
    async fn edit_of_missing_product_creates_nothing() {
        let h = harness();
        let id = conv("chat-1");
        let turn = h
            .controller
            .handle(&id, WizardEvent::Start(StartMode::Edit(ProductId(404))))
            .await;
        assert_eq!(
            turn.outcome,
            Outcome::StartFailed(WizardError::NotFound(ProductId(404)))
        );
        assert!(turn.reply.is_some());
        assert!(!h.controller.is_active(&id).await);
        assert!(h.controller.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn finished_wizards_leave_no_slot_behind() {
        let h = harness();
        let id = conv("chat-1");
        run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                text("Tomato and cheese"),
                choice("1"),
                text("9.50"),
                photo("file-1"),
            ],
        )
        .await;
        assert!(h.controller.sessions().is_empty().await);

        run(&h, &conv("chat-2"), vec![WizardEvent::Start(StartMode::Create), WizardEvent::Cancel]).await;
        assert!(h.controller.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn start_while_active_is_rejected() {
        let h = harness();
        let id = conv("chat-1");
        let turns = run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                WizardEvent::Start(StartMode::Create),
            ],
        )
        .await;
        assert_eq!(turns[2].outcome, Outcome::Rejected(WizardError::AlreadyActive));
        let snapshot = h.controller.sessions().snapshot(&id).await.unwrap();
        assert_eq!(snapshot.current_step(), Some(StepId::Description));
    }

    #[tokio::test]
    async fn interleaved_edits_stay_isolated() {
        let h = harness();
        let espresso = existing(&h.catalog, "Espresso", Decimal::new(250, 2)).await;
        let latte = existing(&h.catalog, "Latte", Decimal::new(400, 2)).await;
        let a = conv("alice");
        let b = conv("bob");

        let script_a = vec![
            WizardEvent::Start(StartMode::Edit(espresso)),
            keep(),
            text("Short and strong"),
            keep(),
            text("2.80"),
            keep(),
        ];
        let script_b = vec![
            WizardEvent::Start(StartMode::Edit(latte)),
            text("Caffe latte"),
            keep(),
            choice("1"),
            keep(),
            photo("latte-new"),
        ];
        for (ea, eb) in script_a.into_iter().zip(script_b) {
            h.controller.handle(&a, ea).await;
            h.controller.handle(&b, eb).await;
        }

        let espresso_after = h.catalog.get_product(espresso).await.unwrap();
        assert_eq!(espresso_after.name, "Espresso");
        assert_eq!(espresso_after.description, "Short and strong");
        assert_eq!(espresso_after.price, Decimal::new(280, 2));
        assert_eq!(espresso_after.image, ImageRef("Espresso-photo".into()));

        let latte_after = h.catalog.get_product(latte).await.unwrap();
        assert_eq!(latte_after.name, "Caffe latte");
        assert_eq!(latte_after.description, "Latte description");
        assert_eq!(latte_after.category_id, CategoryId(1));
        assert_eq!(latte_after.price, Decimal::new(400, 2));
        assert_eq!(latte_after.image, ImageRef("latte-new".into()));
    }

    #[tokio::test]
    async fn concurrent_conversations_run_in_parallel() {
        let h = Arc::new(harness());
        let mut tasks = Vec::new();
        for n in 0..8 {
            let h = h.clone();
            tasks.push(tokio::spawn(async move {
                let id = conv(&format!("chat-{n}"));
                let name = format!("Product {n}");
                run(
                    &h,
                    &id,
                    vec![
                        WizardEvent::Start(StartMode::Create),
                        text(&name),
                        text("Something tasty"),
                        choice("2"),
                        text(&format!("{n}.25")),
                        photo(&format!("photo-{n}")),
                    ],
                )
                .await
            }));
        }
        for task in tasks {
            let turns = task.await.unwrap();
            assert!(matches!(turns.last().unwrap().outcome, Outcome::Committed(_)));
        }
        assert_eq!(h.catalog.product_count().await, 8);
    }

    #[tokio::test]
    async fn commit_failure_ends_the_wizard() {
        let inner = Arc::new(InMemoryCatalog::seeded(&StoreConfig::default()));
        let failing = Arc::new(FailingCatalog::new(inner.clone(), FailureMode::Writes));
        let events = Arc::new(EventBus::new(64));
        let mut rx = events.subscribe();
        let controller = WizardController::new(failing, Arc::new(SessionStore::new()), events);
        let id = conv("chat-1");

        let mut last = None;
        for event in [
            WizardEvent::Start(StartMode::Create),
            text("Margherita"),
            text("Tomato and cheese"),
            choice("1"),
            text("9.50"),
            photo("file-1"),
        ] {
            last = Some(controller.handle(&id, event).await);
        }

        let turn = last.unwrap();
        assert!(matches!(turn.outcome, Outcome::CommitFailed(WizardError::Store(_))));
        assert!(turn.reply.unwrap().text.starts_with("Error: \n"));
        assert!(!controller.is_active(&id).await);
        assert_eq!(inner.product_count().await, 0);

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            saw_failure |= matches!(event.as_ref(), DomainEvent::CommitFailed { .. });
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn category_listing_failure_aborts() {
        let inner = Arc::new(InMemoryCatalog::seeded(&StoreConfig::default()));
        let failing = Arc::new(FailingCatalog::new(inner, FailureMode::Categories));
        let controller = WizardController::new(
            failing,
            Arc::new(SessionStore::new()),
            Arc::new(EventBus::default()),
        );
        let id = conv("chat-1");
        controller.handle(&id, WizardEvent::Start(StartMode::Create)).await;
        controller.handle(&id, text("Margherita")).await;
        let turn = controller.handle(&id, text("Tomato and cheese")).await;

        assert!(matches!(turn.outcome, Outcome::Aborted(WizardError::Store(_))));
        assert_eq!(turn.reply.unwrap().frame, Frame::Closing);
        assert!(!controller.is_active(&id).await);
    }

    #[tokio::test]
    async fn events_trace_the_wizard() {
        let h = harness();
        let mut rx = h.events.subscribe();
        let id = conv("chat-1");
        run(
            &h,
            &id,
            vec![
                WizardEvent::Start(StartMode::Create),
                text("Margherita"),
                WizardEvent::Back,
                WizardEvent::Cancel,
            ],
        )
        .await;

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                DomainEvent::WizardStarted { .. } => "started",
                DomainEvent::StepAnswered { .. } => "answered",
                DomainEvent::SteppedBack { .. } => "back",
                DomainEvent::WizardCancelled { .. } => "cancelled",
                _ => "other",
            });
        }
        assert_eq!(kinds, vec!["started", "answered", "back", "cancelled"]);
    }

    #[tokio::test]
    async fn from_config_uses_the_keep_token() {
        let config = WizardConfig {
            keep_token: "=".into(),
            ..WizardConfig::default()
        };
        let catalog = Arc::new(InMemoryCatalog::seeded(&StoreConfig::default()));
        let pid = existing(&catalog, "Espresso", Decimal::ONE).await;
        let controller = WizardController::from_config(&config, catalog, Arc::new(EventBus::default()));
        assert_eq!(controller.keep_token(), "=");
        assert_eq!(
            controller.sessions().idle_timeout(),
            Some(std::time::Duration::from_secs(1800))
        );

        let turn = controller
            .handle(&conv("chat-1"), WizardEvent::Start(StartMode::Edit(pid)))
            .await;
        assert!(turn.reply.unwrap().text.contains("Send \"=\""));
    }
}

//! Admin router: turns chat messages into wizard events and catalog actions.
//!
//! Menu commands, cancel/back and the assortment buttons are recognized in
//! any state. Everything else goes to the running wizard, if there is one,
//! and is silently dropped otherwise.

use std::sync::Arc;

use shopwright_config::AppConfig;
use shopwright_core::catalog::{CatalogStore, CategoryId, ProductId};
use shopwright_core::channel::ChannelMessage;
use shopwright_core::event::EventBus;
use shopwright_core::message::{ConversationId, OutboundMessage};
use shopwright_wizard::texts;
use shopwright_wizard::{StartMode, WizardController, WizardEvent, WizardInput};
use tracing::{debug, info, warn};

use crate::views;

/// What an inbound message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Menu,
    Wizard(WizardEvent),
    ListCategories,
    ListProducts(CategoryId),
    Delete(ProductId),
    /// Nothing to do
    Drop,
}

pub struct AdminRouter {
    controller: Arc<WizardController>,
    store: Arc<dyn CatalogStore>,
    admins: Vec<String>,
}

impl AdminRouter {
    pub fn new(
        controller: Arc<WizardController>,
        store: Arc<dyn CatalogStore>,
        admins: Vec<String>,
    ) -> Self {
        Self {
            controller,
            store,
            admins,
        }
    }

    /// Wire a router, its wizard and session store from configuration.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn CatalogStore>,
        events: Arc<EventBus>,
    ) -> Self {
        let controller = WizardController::from_config(&config.wizard, store.clone(), events);
        Self::new(Arc::new(controller), store, config.admins.clone())
    }

    pub fn controller(&self) -> &Arc<WizardController> {
        &self.controller
    }

    /// Empty allowlist denies everyone, `"*"` allows everyone.
    pub fn is_admin(&self, sender_id: &str) -> bool {
        self.admins.iter().any(|a| a == "*" || a == sender_id)
    }

    /// Handle one inbound message and return the messages to send back.
    pub async fn route(&self, msg: &ChannelMessage) -> Vec<OutboundMessage> {
        if !self.is_admin(&msg.sender_id) {
            warn!(sender_id = %msg.sender_id, channel = %msg.channel_id, "Message from non-admin dropped");
            return Vec::new();
        }

        let conversation = ConversationId(msg.chat_id.clone());
        let active = self.controller.is_active(&conversation).await;
        let route = classify(msg, active, self.controller.keep_token());
        debug!(conversation_id = %conversation, route = ?route, "Routed message");

        match route {
            Route::Menu => vec![views::menu()],
            Route::Wizard(event) => {
                let turn = self.controller.handle(&conversation, event).await;
                turn.reply.map(views::wizard_reply).into_iter().collect()
            }
            Route::ListCategories => match self.store.list_categories().await {
                Ok(categories) => vec![views::category_picker(&categories)],
                Err(e) => vec![store_failure(&e)],
            },
            Route::ListProducts(category) => match self.store.list_products(category).await {
                Ok(products) if products.is_empty() => {
                    vec![OutboundMessage::text(views::EMPTY_CATEGORY)]
                }
                Ok(products) => {
                    let mut out: Vec<_> = products.iter().map(views::product_card).collect();
                    out.push(OutboundMessage::text(views::LIST_FOOTER));
                    out
                }
                Err(e) => vec![store_failure(&e)],
            },
            Route::Delete(id) => match self.store.delete_product(id).await {
                Ok(()) => {
                    info!(conversation_id = %conversation, product_id = %id, "Product deleted");
                    vec![OutboundMessage::text(views::PRODUCT_REMOVED)]
                }
                Err(e) => vec![store_failure(&e)],
            },
            Route::Drop => Vec::new(),
        }
    }
}

fn store_failure(e: &shopwright_core::error::CatalogError) -> OutboundMessage {
    warn!(error = %e, "Catalog operation failed");
    OutboundMessage::text(texts::store_failure(&e.to_string()))
}

/// Decide what `msg` asks for, given whether a wizard is running.
pub fn classify(msg: &ChannelMessage, wizard_active: bool, keep_token: &str) -> Route {
    if let Some(data) = msg.callback_data.as_deref() {
        return classify_callback(data, wizard_active);
    }

    if let Some(image) = msg.largest_image() {
        if !wizard_active {
            return Route::Drop;
        }
        let caption = msg.content.trim();
        return Route::Wizard(WizardEvent::Input(WizardInput::Photo {
            file_id: image.file_id.clone(),
            caption: (!caption.is_empty()).then(|| caption.to_string()),
        }));
    }

    let text = msg.content.trim();
    let lowered = text.to_lowercase();
    match lowered.as_str() {
        "/admin" | "/start" => return Route::Menu,
        "cancel" | "/cancel" => return Route::Wizard(WizardEvent::Cancel),
        "back" | "/back" => return Route::Wizard(WizardEvent::Back),
        _ => {}
    }
    if text == views::ASSORTMENT {
        return Route::ListCategories;
    }

    if !wizard_active {
        return if text == views::ADD_PRODUCT {
            Route::Wizard(WizardEvent::Start(StartMode::Create))
        } else {
            Route::Drop
        };
    }

    let input = if text == keep_token {
        WizardInput::Keep
    } else {
        WizardInput::Text(msg.content.clone())
    };
    Route::Wizard(WizardEvent::Input(input))
}

fn classify_callback(data: &str, wizard_active: bool) -> Route {
    if let Some(id) = views::parse_callback(data, views::CATEGORY_PREFIX) {
        return Route::ListProducts(CategoryId(id));
    }
    if let Some(id) = views::parse_callback(data, views::DELETE_PREFIX) {
        return Route::Delete(ProductId(id));
    }
    if !wizard_active {
        return match views::parse_callback(data, views::CHANGE_PREFIX) {
            Some(id) => Route::Wizard(WizardEvent::Start(StartMode::Edit(ProductId(id)))),
            None => Route::Drop,
        };
    }
    let input = if data == texts::KEEP_CALLBACK {
        WizardInput::Keep
    } else {
        WizardInput::Choice(data.to_string())
    };
    Route::Wizard(WizardEvent::Input(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopwright_core::channel::ChannelId;

    fn text(content: &str) -> ChannelMessage {
        ChannelMessage::text(ChannelId("test".into()), "admin", "chat", content)
    }

    fn tap(data: &str) -> ChannelMessage {
        ChannelMessage::callback(ChannelId("test".into()), "admin", "chat", data)
    }

    fn input(i: WizardInput) -> Route {
        Route::Wizard(WizardEvent::Input(i))
    }

    #[test]
    fn menu_commands() {
        assert_eq!(classify(&text("/admin"), false, "."), Route::Menu);
        assert_eq!(classify(&text("/start"), true, "."), Route::Menu);
    }

    #[test]
    fn cancel_and_back_are_case_insensitive() {
        for word in ["cancel", "Cancel", "/cancel", " CANCEL "] {
            assert_eq!(classify(&text(word), true, "."), Route::Wizard(WizardEvent::Cancel));
        }
        assert_eq!(classify(&text("Back"), false, "."), Route::Wizard(WizardEvent::Back));
    }

    #[test]
    fn add_product_starts_only_when_idle() {
        assert_eq!(
            classify(&text("Add product"), false, "."),
            Route::Wizard(WizardEvent::Start(StartMode::Create))
        );
        assert_eq!(
            classify(&text("Add product"), true, "."),
            input(WizardInput::text("Add product"))
        );
    }

    #[test]
    fn change_starts_an_edit_only_when_idle() {
        assert_eq!(
            classify(&tap("change_5"), false, "."),
            Route::Wizard(WizardEvent::Start(StartMode::Edit(ProductId(5))))
        );
        assert_eq!(
            classify(&tap("change_5"), true, "."),
            input(WizardInput::Choice("change_5".into()))
        );
    }

    #[test]
    fn assortment_callbacks_work_in_any_state() {
        for active in [false, true] {
            assert_eq!(classify(&text("Assortment"), active, "."), Route::ListCategories);
            assert_eq!(
                classify(&tap("category_2"), active, "."),
                Route::ListProducts(CategoryId(2))
            );
            assert_eq!(classify(&tap("delete_9"), active, "."), Route::Delete(ProductId(9)));
        }
    }

    #[test]
    fn wizard_inputs_are_normalized() {
        assert_eq!(classify(&tap("2"), true, "."), input(WizardInput::Choice("2".into())));
        assert_eq!(classify(&tap("keep"), true, "."), input(WizardInput::Keep));
        assert_eq!(classify(&text("."), true, "."), input(WizardInput::Keep));
        assert_eq!(classify(&text("."), true, "="), input(WizardInput::text(".")));
        assert_eq!(
            classify(&text("Margherita"), true, "."),
            input(WizardInput::text("Margherita"))
        );
    }

    #[test]
    fn photos_use_the_largest_size_and_caption() {
        let mut msg = ChannelMessage::photo(ChannelId("test".into()), "admin", "chat", "small", "nice");
        msg.attachments.push(shopwright_core::channel::Attachment {
            kind: shopwright_core::channel::AttachmentKind::Image,
            file_id: "large".into(),
            size_bytes: None,
        });
        assert_eq!(
            classify(&msg, true, "."),
            input(WizardInput::Photo {
                file_id: "large".into(),
                caption: Some("nice".into()),
            })
        );
        assert_eq!(classify(&msg, false, "."), Route::Drop);
    }

    #[test]
    fn idle_chatter_is_dropped() {
        assert_eq!(classify(&text("hello"), false, "."), Route::Drop);
        assert_eq!(classify(&tap("2"), false, "."), Route::Drop);
    }
}

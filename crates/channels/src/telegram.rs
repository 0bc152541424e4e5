//! Telegram channel adapter (stub).
//!
//! Implements the Channel trait for the Telegram Bot API.
//! In production, this would use `teloxide` for long-polling or webhook mode.
//! Currently a stub: inbound messages are injected in-process and outbound
//! messages are logged and kept in an outbox.

use async_trait::async_trait;
use shopwright_config::TelegramSettings;
use shopwright_core::channel::{Channel, ChannelId, ChannelMessage};
use shopwright_core::error::ChannelError;
use shopwright_core::message::OutboundMessage;
use tokio::sync::{Mutex, mpsc};
use tracing::info;

/// Telegram channel adapter.
pub struct TelegramChannel {
    settings: TelegramSettings,
    channel_id: ChannelId,
    /// Sender for injecting inbound messages.
    inject_tx: Mutex<Option<mpsc::Sender<Result<ChannelMessage, ChannelError>>>>,
    outbox: Mutex<Vec<(String, OutboundMessage)>>,
}

impl TelegramChannel {
    pub fn new(settings: TelegramSettings) -> Self {
        Self {
            settings,
            channel_id: ChannelId("telegram".into()),
            inject_tx: Mutex::new(None),
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Inject a message as if it came from Telegram.
    pub async fn inject_message(&self, msg: ChannelMessage) -> Result<(), ChannelError> {
        let guard = self.inject_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            tx.send(Ok(msg))
                .await
                .map_err(|_| ChannelError::ConnectionLost("Message channel closed".into()))
        } else {
            Err(ChannelError::ConnectionLost("Channel not started".into()))
        }
    }

    /// Everything sent so far, as `(chat_id, message)` pairs.
    pub async fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.outbox.lock().await.clone()
    }

    /// Messages sent to one chat, in order.
    pub async fn sent_to(&self, chat_id: &str) -> Vec<OutboundMessage> {
        self.outbox
            .lock()
            .await
            .iter()
            .filter(|(chat, _)| chat == chat_id)
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        if self.settings.bot_token.is_none() {
            return Err(ChannelError::NotConfigured(
                "telegram.bot_token is not set".into(),
            ));
        }
        info!(webhook = self.settings.use_webhook, "Telegram channel starting (stub mode)");
        let (tx, rx) = mpsc::channel(64);
        *self.inject_tx.lock().await = Some(tx);
        // In production: spawn teloxide long-polling loop here
        Ok(rx)
    }

    async fn send(&self, chat_id: &str, message: &OutboundMessage) -> Result<(), ChannelError> {
        info!(
            chat_id = %chat_id,
            photo = message.photo.is_some(),
            text_len = message.text.len(),
            "Telegram send (stub)"
        );
        // In production: sendMessage / sendPhoto with the rendered markup
        self.outbox
            .lock()
            .await
            .push((chat_id.to_string(), message.clone()));
        Ok(())
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Telegram channel stopping");
        *self.inject_tx.lock().await = None;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        // In production: call getMe API
        Ok(self
            .settings
            .bot_token
            .as_deref()
            .is_some_and(|t| !t.is_empty()))
    }
}

//! Channel trait: the abstraction over chat platforms.
//!
//! A Channel connects Shopwright to a messaging platform (Telegram, CLI,
//! etc.). It receives operator messages and delivers the bot's answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;
use crate::message::OutboundMessage;

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The channel this message belongs to
    pub channel_id: ChannelId,

    /// Sender identifier (platform-specific user ID)
    pub sender_id: String,

    /// Human-readable sender name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// The chat/DM identifier within the channel
    pub chat_id: String,

    /// The text content (the caption for photo messages)
    #[serde(default)]
    pub content: String,

    /// Attachments (photos, in the sizes the platform provides)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// Data of a pressed inline button, if this is a button press
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

impl ChannelMessage {
    /// A plain text message.
    pub fn text(channel_id: ChannelId, sender_id: &str, chat_id: &str, content: &str) -> Self {
        Self {
            channel_id,
            sender_id: sender_id.into(),
            sender_name: None,
            chat_id: chat_id.into(),
            content: content.into(),
            attachments: vec![],
            callback_data: None,
        }
    }

    /// An inline button press.
    pub fn callback(channel_id: ChannelId, sender_id: &str, chat_id: &str, data: &str) -> Self {
        Self {
            callback_data: Some(data.into()),
            ..Self::text(channel_id, sender_id, chat_id, "")
        }
    }

    /// A photo with an optional caption.
    pub fn photo(
        channel_id: ChannelId,
        sender_id: &str,
        chat_id: &str,
        file_id: &str,
        caption: &str,
    ) -> Self {
        Self {
            attachments: vec![Attachment {
                kind: AttachmentKind::Image,
                file_id: file_id.into(),
                size_bytes: None,
            }],
            ..Self::text(channel_id, sender_id, chat_id, caption)
        }
    }

    /// The largest image attachment, if any.
    ///
    /// Platforms list photo sizes smallest first, so the last image wins
    /// when sizes are unknown.
    pub fn largest_image(&self) -> Option<&Attachment> {
        self.attachments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind == AttachmentKind::Image)
            .max_by_key(|(i, a)| (a.size_bytes.unwrap_or(0), *i))
            .map(|(_, a)| a)
    }
}

/// An attachment in a channel message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Type of attachment
    pub kind: AttachmentKind,

    /// Platform file id
    pub file_id: String,

    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    Document,
    Other,
}

/// The core Channel trait.
///
/// Implementations handle platform-specific connection logic, message
/// formatting, and keyboard rendering.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "telegram", "cli").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Start listening for incoming messages.
    ///
    /// Returns a receiver that yields incoming messages. The channel
    /// implementation handles polling or webhooks internally.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Deliver a message to a specific chat.
    async fn send(
        &self,
        chat_id: &str,
        message: &OutboundMessage,
    ) -> std::result::Result<(), ChannelError>;

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Health check: is the channel connected and operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}

//! Conversation identity and outbound message types.
//!
//! These are the value objects that flow between the bot core and the
//! transport: Channel receives a message → router dispatches it → the
//! core answers with an `OutboundMessage` → Channel delivers it.

use serde::{Deserialize, Serialize};

/// Unique identifier for a conversation (one chat with one operator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One inline button: a visible label and the callback data it sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub data: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Keyboard attached to an outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyMarkup {
    /// Leave whatever keyboard the client shows untouched.
    #[default]
    None,
    /// Inline buttons under the message, laid out in rows of `row_width`.
    Inline { choices: Vec<Choice>, row_width: usize },
    /// A persistent reply keyboard of plain-text buttons.
    Keyboard {
        buttons: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        row_width: usize,
    },
    /// Remove the reply keyboard.
    Remove,
}

impl ReplyMarkup {
    /// Inline buttons, one per row.
    pub fn inline(choices: Vec<Choice>) -> Self {
        ReplyMarkup::Inline {
            choices,
            row_width: 1,
        }
    }

    /// Rows of `row_width` buttons, left to right.
    pub fn rows(&self) -> Vec<Vec<String>> {
        match self {
            ReplyMarkup::Inline { choices, row_width } => choices
                .chunks((*row_width).max(1))
                .map(|row| row.iter().map(|c| c.label.clone()).collect())
                .collect(),
            ReplyMarkup::Keyboard {
                buttons, row_width, ..
            } => buttons
                .chunks((*row_width).max(1))
                .map(|row| row.to_vec())
                .collect(),
            ReplyMarkup::None | ReplyMarkup::Remove => Vec::new(),
        }
    }
}

/// A message the bot sends to a chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Text body (or photo caption when `photo` is set)
    pub text: String,

    /// Photo to send, by transport file id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,

    /// Keyboard to attach
    #[serde(default)]
    pub markup: ReplyMarkup,
}

impl OutboundMessage {
    /// A plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A photo with a caption.
    pub fn photo(file_id: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            text: caption.into(),
            photo: Some(file_id.into()),
            markup: ReplyMarkup::None,
        }
    }

    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.markup = markup;
        self
    }
}

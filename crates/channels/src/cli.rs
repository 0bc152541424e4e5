//! CLI channel: interactive terminal chat with the admin bot.
//!
//! Reads stdin lines and writes replies to stdout. Besides plain text, two
//! prefixes stand in for what a chat client would send:
//!
//! - `photo:<file_id> [caption]` uploads a photo
//! - `tap:<data>` presses an inline button
//!
//! Used by `shopwright chat`.

use async_trait::async_trait;
use shopwright_core::channel::{Channel, ChannelId, ChannelMessage};
use shopwright_core::error::ChannelError;
use shopwright_core::message::{OutboundMessage, ReplyMarkup};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Sender id of the person at the terminal.
pub const LOCAL_USER: &str = "local_user";
/// The single chat a terminal session has.
pub const LOCAL_CHAT: &str = "cli_session";

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("cli".into()),
        }
    }

    /// Turn one input line into a message. Blank lines yield nothing.
    pub fn parse_line(&self, line: &str) -> Option<ChannelMessage> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(rest) = line.strip_prefix("photo:") {
            let (file_id, caption) = match rest.trim().split_once(char::is_whitespace) {
                Some((file_id, caption)) => (file_id, caption.trim()),
                None => (rest.trim(), ""),
            };
            if !file_id.is_empty() {
                return Some(ChannelMessage::photo(
                    self.id.clone(),
                    LOCAL_USER,
                    LOCAL_CHAT,
                    file_id,
                    caption,
                ));
            }
        }

        if let Some(data) = line.strip_prefix("tap:") {
            let data = data.trim();
            if !data.is_empty() {
                return Some(ChannelMessage::callback(
                    self.id.clone(),
                    LOCAL_USER,
                    LOCAL_CHAT,
                    data,
                ));
            }
        }

        Some(ChannelMessage::text(self.id.clone(), LOCAL_USER, LOCAL_CHAT, line))
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain-text rendering of an outbound message.
pub fn render(message: &OutboundMessage) -> String {
    let mut out = String::new();
    if let Some(photo) = &message.photo {
        out.push_str(&format!("[photo {photo}]\n"));
    }
    out.push_str(&message.text);

    match &message.markup {
        ReplyMarkup::Inline { choices, row_width } => {
            for row in choices.chunks((*row_width).max(1)) {
                let buttons: Vec<String> = row
                    .iter()
                    .map(|c| format!("[{}] (tap:{})", c.label, c.data))
                    .collect();
                out.push('\n');
                out.push_str(&buttons.join("  "));
            }
        }
        ReplyMarkup::Keyboard { placeholder, .. } => {
            for row in message.markup.rows() {
                out.push('\n');
                out.push_str(&format!("< {} >", row.join(" | ")));
            }
            if let Some(placeholder) = placeholder {
                out.push_str(&format!("\n({placeholder})"));
            }
        }
        ReplyMarkup::None | ReplyMarkup::Remove => {}
    }
    out
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let parser = CliChannel::new();

        tokio::spawn(async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if matches!(line.trim(), "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }
                        let Some(msg) = parser.parse_line(&line) else {
                            continue;
                        };
                        if tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, _chat_id: &str, message: &OutboundMessage) -> Result<(), ChannelError> {
        println!("{}\n", render(message));
        Ok(())
    }
}

//! Outbound messages of the admin bot.

use shopwright_core::catalog::{Category, Product};
use shopwright_core::message::{Choice, OutboundMessage, ReplyMarkup};
use shopwright_wizard::{Frame, Reply};

pub const MENU_TEXT: &str = "What do you want to do?";
pub const MENU_PLACEHOLDER: &str = "Select an action";
pub const ADD_PRODUCT: &str = "Add product";
pub const ASSORTMENT: &str = "Assortment";
pub const SELECT_CATEGORY: &str = "Select category";
pub const LIST_FOOTER: &str = "OK, here is the list of products ⏫";
pub const EMPTY_CATEGORY: &str = "There are no products in this category yet";
pub const PRODUCT_REMOVED: &str = "Product removed!";

/// Callback prefixes of the assortment buttons.
pub const CATEGORY_PREFIX: &str = "category_";
pub const DELETE_PREFIX: &str = "delete_";
pub const CHANGE_PREFIX: &str = "change_";

/// The admin reply keyboard.
pub fn menu_markup() -> ReplyMarkup {
    ReplyMarkup::Keyboard {
        buttons: vec![ADD_PRODUCT.into(), ASSORTMENT.into()],
        placeholder: Some(MENU_PLACEHOLDER.into()),
        row_width: 2,
    }
}

pub fn menu() -> OutboundMessage {
    OutboundMessage::text(MENU_TEXT).with_markup(menu_markup())
}

/// Categories as `category_<id>` buttons.
pub fn category_picker(categories: &[Category]) -> OutboundMessage {
    let choices = categories
        .iter()
        .map(|c| Choice::new(&c.name, format!("{CATEGORY_PREFIX}{}", c.id)))
        .collect();
    OutboundMessage::text(SELECT_CATEGORY).with_markup(ReplyMarkup::inline(choices))
}

/// Photo card of one product with its Delete and Change buttons.
pub fn product_card(product: &Product) -> OutboundMessage {
    let caption = format!(
        "<b>{}</b>\n{}\nPrice: {:.2}",
        html_escape(&product.name),
        html_escape(&product.description),
        product.price
    );
    OutboundMessage::photo(product.image.0.clone(), caption).with_markup(ReplyMarkup::Inline {
        choices: vec![
            Choice::new("Delete", format!("{DELETE_PREFIX}{}", product.id)),
            Choice::new("Change", format!("{CHANGE_PREFIX}{}", product.id)),
        ],
        row_width: 2,
    })
}

/// Escape text for Telegram's HTML parse mode.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render a wizard reply for the chat.
///
/// Choices become inline buttons. A wizard that just started hides the
/// admin keyboard, and one that just ended brings it back.
pub fn wizard_reply(reply: Reply) -> OutboundMessage {
    let markup = if !reply.choices.is_empty() {
        ReplyMarkup::inline(reply.choices)
    } else {
        match reply.frame {
            Frame::Opening => ReplyMarkup::Remove,
            Frame::Ongoing => ReplyMarkup::None,
            Frame::Closing => menu_markup(),
        }
    };
    OutboundMessage::text(reply.text).with_markup(markup)
}

/// The id in `<prefix><id>` callback data.
pub fn parse_callback(data: &str, prefix: &str) -> Option<i64> {
    data.strip_prefix(prefix)?.parse().ok()
}

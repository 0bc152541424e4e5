//! # Shopwright Core
//!
//! Domain types, traits, and error definitions for the Shopwright catalog
//! admin bot. This crate has **no transport or storage dependencies**. It defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping the catalog store or transport via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod catalog;
pub mod channel;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, CatalogError, ChannelError};
pub use message::{Choice, ConversationId, OutboundMessage, ReplyMarkup};
pub use catalog::{
    CatalogStore, Category, CategoryId, EntityDraft, ImageRef, InfoPage, Product, ProductId,
};
pub use channel::{Attachment, AttachmentKind, Channel, ChannelId, ChannelMessage};
pub use event::{DomainEvent, EventBus};

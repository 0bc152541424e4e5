//! Admin side of the Shopwright bot.
//!
//! [`AdminRouter`] decides what each operator message means: a menu
//! command, an assortment action, or input for the running product
//! wizard. [`Dispatcher`] feeds a channel's messages to the router, one
//! worker per chat.

pub mod dispatcher;
pub mod router;
pub mod views;

pub use dispatcher::Dispatcher;
pub use router::{AdminRouter, Route, classify};

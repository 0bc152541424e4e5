//! `shopwright serve`: run the admin bot on Telegram.

use std::sync::Arc;

use shopwright_admin::Dispatcher;
use shopwright_channels::TelegramChannel;
use shopwright_config::AppConfig;
use shopwright_core::channel::Channel;
use shopwright_core::event::DomainEvent;
use tracing::{debug, info, warn};

use super::Runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if config.telegram.bot_token.is_none() {
        return Err("No bot token configured. Set SHOPWRIGHT_BOT_TOKEN or telegram.bot_token.".into());
    }
    if config.admins.is_empty() {
        warn!("No admins configured, every message will be ignored");
    }

    println!("🛒 Shopwright: serving on Telegram");
    println!("   Admins:       {}", config.admins.len());
    println!("   Categories:   {}", config.store.categories.len());
    println!(
        "   Idle timeout: {}",
        match config.wizard.idle_timeout() {
            Some(t) => format!("{}s", t.as_secs()),
            None => "disabled".into(),
        }
    );

    let runtime = Runtime::start(&config);
    let channel = Arc::new(TelegramChannel::new(config.telegram.clone()));

    // Domain events go to the log
    let mut events = runtime.events.subscribe();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.as_ref() {
                DomainEvent::ProductCommitted {
                    conversation_id,
                    product_id,
                    updated,
                    ..
                } => info!(%conversation_id, product_id, updated, "Product saved"),
                DomainEvent::CommitFailed {
                    conversation_id,
                    error_message,
                    ..
                } => warn!(%conversation_id, error = %error_message, "Product not saved"),
                other => debug!(event = ?other, "Domain event"),
            }
        }
    });

    let dispatcher = Dispatcher::new(runtime.router.clone(), channel.clone());
    tokio::select! {
        result = dispatcher.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            channel.stop().await?;
            dispatcher.shutdown().await;
        }
    }

    event_log.abort();
    Ok(())
}

//! `shopwright chat`: talk to the admin bot from the terminal.

use std::sync::Arc;

use shopwright_admin::{Dispatcher, views};
use shopwright_channels::CliChannel;
use shopwright_channels::cli::{LOCAL_CHAT, LOCAL_USER};
use shopwright_config::AppConfig;
use shopwright_core::channel::Channel;

use super::Runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    // The person at the terminal is the admin
    config.admins = vec![LOCAL_USER.into()];

    let runtime = Runtime::start(&config);
    let channel = Arc::new(CliChannel::new());

    println!("🛒 Shopwright admin chat");
    println!("   Type messages as you would in the chat app.");
    println!("   photo:<file_id> [caption]  uploads a photo");
    println!("   tap:<data>                 presses an inline button");
    println!(
        "   \"{}\" keeps the current value while editing; exit or Ctrl+D quits\n",
        config.wizard.keep_token
    );
    channel.send(LOCAL_CHAT, &views::menu()).await?;

    let dispatcher = Dispatcher::new(runtime.router.clone(), channel);
    dispatcher.run().await?;

    println!("Bye!");
    Ok(())
}

//! Chat command dispatch.

use crate::session::handle::SessionHandle;
use log::info;

/// Runs a chat command. `text` is the message with its leading `/` removed.
pub trait CommandDispatcher: Send + Sync {
    fn parse(&self, player: &SessionHandle, text: &str);
}

/// Knows no commands; tells the player so.
#[derive(Debug, Default)]
pub struct DefaultCommands;

impl CommandDispatcher for DefaultCommands {
    fn parse(&self, player: &SessionHandle, text: &str) {
        let name = text.split_whitespace().next().unwrap_or_default();
        info!("{} tried command /{}", player.display_name(), text);
        player.message(&format!("Unknown command: {}", name));
    }
}

use super::Session;
use crate::error::{SessionError, CHAT_SPAM, HACKING_DETECTED};
use log::{info, warn};
use shared::packets::ChatMessage;
use shared::validation::contains_invalid_chars;
use shared::OpCode;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};

/// Sent by WoM clients to identify themselves. Not chat.
const WOM_ID_PREFIX: &str = "/womid ";
const CONTINUATION: &str = " /";
const ESCAPED_CONTINUATION: &str = " //";

/// Longest text a partial message may buffer.
pub const MAX_PARTIAL_LENGTH: usize = 512;

/// What to do with one line of client chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    /// `/nvm` or `/cancel`.
    Cancelled { had_partial: bool },
    /// Line ended in `" /"`; this is everything buffered so far.
    Partial(String),
    /// The buffer would pass [`MAX_PARTIAL_LENGTH`] and was dropped.
    TooLong,
    /// Command text without its leading `/`.
    Command(String),
    /// A lone `/`.
    Unparsable,
    Chat(String),
    Ignore,
}

/// Resolves partial-message buffering, escapes and command routing for
/// one line of chat. `partial` carries buffered text between lines.
pub fn interpret(partial: &mut Option<String>, raw: &str) -> ChatAction {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("/nvm") || lower.starts_with("/cancel") {
        return ChatAction::Cancelled {
            had_partial: partial.take().is_some(),
        };
    }

    let mut message = match partial.take() {
        Some(buffered) => buffered + raw,
        None => raw.to_string(),
    };
    if message.ends_with(CONTINUATION) {
        message.pop();
        if message.len() > MAX_PARTIAL_LENGTH {
            return ChatAction::TooLong;
        }
        *partial = Some(message.clone());
        return ChatAction::Partial(message);
    }
    if message.ends_with(ESCAPED_CONTINUATION) {
        message.pop();
    }

    if message.is_empty() {
        return ChatAction::Ignore;
    }
    if let Some(rest) = message.strip_prefix('/') {
        if rest.is_empty() {
            return ChatAction::Unparsable;
        }
        if !rest.starts_with('/') {
            return ChatAction::Command(rest.to_string());
        }
        return ChatAction::Chat(rest.to_string());
    }
    ChatAction::Chat(message)
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub(super) async fn handle_message(&mut self) -> Result<(), SessionError> {
        self.handle.reset_idle_timer();
        let packet: ChatMessage = self.reader.read_body(OpCode::Message).await?;
        let raw = packet.message.into_inner();
        let name = self.handle.display_name();

        if raw.starts_with(WOM_ID_PREFIX) {
            return Ok(());
        }
        if contains_invalid_chars(&raw) {
            warn!("{} tried to write illegal characters in chat", name);
            return Err(SessionError::Abuse(HACKING_DETECTED));
        }

        match interpret(&mut self.partial_message, &raw) {
            ChatAction::Cancelled { had_partial: true } => {
                self.handle.message("Partial message cancelled.")
            }
            ChatAction::Cancelled { had_partial: false } => {
                self.handle.message("No partial message to cancel.")
            }
            ChatAction::Partial(text) => {
                // Partial lines count as chat.
                if self.chat_spam.is_spam(Instant::now()) {
                    warn!("{} was kicked for chat spam", name);
                    return Err(SessionError::Abuse(CHAT_SPAM));
                }
                self.handle.message(&format!("Partial: &F{}", text))
            }
            ChatAction::TooLong => {
                warn!("{} overflowed the partial message buffer", name);
                self.handle.message("Partial message too long, discarded.")
            }
            ChatAction::Unparsable => self.handle.message("Cannot parse message."),
            ChatAction::Command(text) => self.ctx.commands.parse(&self.handle, &text),
            ChatAction::Chat(text) => {
                if self.chat_spam.is_spam(Instant::now()) {
                    warn!("{} was kicked for chat spam", name);
                    return Err(SessionError::Abuse(CHAT_SPAM));
                }
                info!("{}: {}", name, text);
                self.ctx
                    .directory
                    .message(None, &format!("&F{}: {}", name, text));
            }
            ChatAction::Ignore => {}
        }
        Ok(())
    }
}

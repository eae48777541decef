pub mod commands;
pub mod core;
pub mod scheduler;
pub use self::core::*;
pub use scheduler::{CURSOR_MARKER, EditScheduler, PLACEHOLDER};

use std::sync::Arc;

use crate::telegram::Update;

/// Entry point for one polled update, spawned as its own task by the
/// poll loop. Commands are answered directly; everything else is
/// relayed through the model.
pub async fn handle_update(ctx: Arc<BotContext>, update: Update) {
    let Some(message) = update.message else {
        tracing::trace!("Skipping update {} with no message", update.update_id);
        return;
    };
    let chat_id = message.chat.id;
    let Some(text) = message.text.as_deref() else {
        tracing::trace!("Skipping non-text message in chat {}", chat_id);
        return;
    };
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    if let Some(command) = commands::parse_command(text) {
        if let Err(err) = commands::handle_command(&ctx, chat_id, command).await {
            tracing::error!("Command handling failed for chat {}: {}", chat_id, err);
        }
        return;
    }

    match relay_chat_message(&ctx, chat_id, text).await {
        RelayOutcome::Committed { assistant_chars } => {
            tracing::info!(
                "Relayed reply to chat {} ({} chars)",
                chat_id,
                assistant_chars
            );
        }
        RelayOutcome::Failed(failure) => {
            tracing::warn!("Relay for chat {} gave up: {:?}", chat_id, failure);
        }
    }
}

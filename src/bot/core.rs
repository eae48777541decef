//! The relay engine: turn one incoming chat message into one streamed
//! reply, then persist the completed exchange.
//!
//! Each request moves through a linear set of phases. The placeholder
//! message goes out first, the model stream is mirrored into that
//! message via the edit scheduler, and only a stream that ends
//! naturally is committed to history. `Committed` and `Failed` are
//! terminal; nothing touches the reply message after either is reached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Error, Result};
use futures_util::StreamExt;
use tokio_rusqlite::Connection;

use crate::core::AppConfig;
use crate::history;
use crate::openai::{self, Message, Role};
use crate::telegram::{MessageHandle, TelegramClient};

use super::scheduler::{EditScheduler, PLACEHOLDER};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayPhase {
    /// Placeholder sent, stream not yet open.
    Pending,
    /// Fragments are arriving and being mirrored into the message.
    Streaming,
    /// Stream ended naturally; final edit and commit remain.
    Finalizing,
    Committed,
    Failed,
}

impl RelayPhase {
    pub fn permits(self, to: RelayPhase) -> bool {
        use RelayPhase::*;
        matches!(
            (self, to),
            (Pending, Streaming)
                | (Pending, Failed)
                | (Streaming, Finalizing)
                | (Streaming, Failed)
                | (Finalizing, Committed)
                | (Finalizing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RelayPhase::Committed | RelayPhase::Failed)
    }

    fn advance(self, to: RelayPhase, chat_id: i64) -> RelayPhase {
        debug_assert!(
            self.permits(to),
            "illegal relay transition {:?} -> {:?}",
            self,
            to
        );
        tracing::trace!("Relay for chat {} moved {:?} -> {:?}", chat_id, self, to);
        to
    }
}

/// Where a failed relay request gave up. Each variant carries the root
/// error for logging; the chat-facing annotation was already sent by
/// the time the outcome is returned.
#[derive(Debug)]
pub enum RelayFailure {
    PromptAssembly(Error),
    SendPlaceholder(Error),
    StreamOpen(Error),
    Stream(Error),
    Commit(Error),
}

#[derive(Debug)]
pub enum RelayOutcome {
    Committed { assistant_chars: usize },
    Failed(RelayFailure),
}

/// Everything a request handler needs, created once at startup and
/// shared across all in-flight requests.
pub struct BotContext {
    pub db: Connection,
    pub config: AppConfig,
    pub telegram: TelegramClient,
    pub http: reqwest::Client,
    commit_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl BotContext {
    pub fn new(db: Connection, config: AppConfig, telegram: TelegramClient) -> Self {
        BotContext {
            db,
            config,
            telegram,
            http: reqwest::Client::new(),
            commit_locks: Mutex::new(HashMap::new()),
        }
    }

    /// One lock per chat so overlapping replies commit their exchange
    /// pairs one at a time, in stream-finish order.
    fn commit_lock(&self, chat_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.commit_locks.lock().expect("commit lock map poisoned");
        locks.entry(chat_id).or_default().clone()
    }
}

/// Assemble the model prompt: persona (stored override or configured
/// default), the recent history window oldest first, then the new user
/// message.
pub async fn build_prompt(
    db: &Connection,
    config: &AppConfig,
    chat_id: i64,
    user_text: &str,
) -> Result<Vec<Message>, Error> {
    let persona = history::get_persona(db, chat_id)
        .await?
        .unwrap_or_else(|| config.system_prompt.clone());
    let exchanges = history::fetch_last_exchanges(db, chat_id, config.history_pairs).await?;

    let mut messages = Vec::with_capacity(exchanges.len() + 2);
    messages.push(Message::new(Role::System, &persona));
    for exchange in &exchanges {
        messages.push(Message::new(exchange.role, &exchange.content));
    }
    messages.push(Message::new(Role::User, user_text));
    Ok(messages)
}

/// Relay one user message through the model and back into the chat.
///
/// History is read before anything becomes visible in the chat, so a
/// store failure at that point produces an error reply instead of a
/// dangling placeholder. After the placeholder is sent there is always
/// a message to carry either the reply or an error annotation.
pub async fn relay_chat_message(ctx: &BotContext, chat_id: i64, user_text: &str) -> RelayOutcome {
    // The typing indicator is cosmetic; failures don't matter
    if let Err(err) = ctx.telegram.send_chat_action(chat_id, "typing").await {
        tracing::debug!("Chat action failed for chat {}: {}", chat_id, err);
    }

    let prompt = match build_prompt(&ctx.db, &ctx.config, chat_id, user_text).await {
        Ok(prompt) => prompt,
        Err(err) => {
            tracing::error!("Prompt assembly failed for chat {}: {}", chat_id, err);
            let reply = format!("⚠️ Something went wrong: {}", short_diagnostic(&err));
            if let Err(send_err) = ctx.telegram.send_message(chat_id, &reply).await {
                tracing::warn!("Error reply failed for chat {}: {}", chat_id, send_err);
            }
            return RelayOutcome::Failed(RelayFailure::PromptAssembly(err));
        }
    };

    let handle = match ctx.telegram.send_message(chat_id, PLACEHOLDER).await {
        Ok(handle) => handle,
        Err(err) => {
            tracing::error!("Placeholder send failed for chat {}: {}", chat_id, err);
            return RelayOutcome::Failed(RelayFailure::SendPlaceholder(err));
        }
    };
    let mut phase = RelayPhase::Pending;

    let mut stream = match openai::stream_chat_completion(
        &ctx.http,
        &ctx.config.api_base,
        &ctx.config.api_key,
        &ctx.config.model,
        &prompt,
    )
    .await
    {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!("Stream open failed for chat {}: {}", chat_id, err);
            edit_with_error(ctx, handle, &err).await;
            phase.advance(RelayPhase::Failed, chat_id);
            return RelayOutcome::Failed(RelayFailure::StreamOpen(err));
        }
    };
    phase = phase.advance(RelayPhase::Streaming, chat_id);

    let mut scheduler = EditScheduler::new(
        ctx.config.chars_per_edit,
        ctx.config.edit_interval,
        Instant::now(),
    );

    while let Some(item) = stream.next().await {
        match item {
            Ok(fragment) => {
                if let Some(rendered) = scheduler.push(&fragment, Instant::now()) {
                    // A throttled edit that fails is dropped; the next
                    // flush carries the missed text anyway
                    if let Err(err) = ctx.telegram.edit_message(handle, &rendered).await {
                        tracing::debug!("Intermediate edit failed for chat {}: {}", chat_id, err);
                    }
                }
            }
            Err(err) => {
                tracing::error!("Stream failed mid-reply for chat {}: {}", chat_id, err);
                edit_with_error(ctx, handle, &err).await;
                phase.advance(RelayPhase::Failed, chat_id);
                return RelayOutcome::Failed(RelayFailure::Stream(err));
            }
        }
    }
    phase = phase.advance(RelayPhase::Finalizing, chat_id);

    // Strip the cursor for the resting text. A failed final edit leaves
    // the last intermediate render in the chat but doesn't block the
    // commit
    let final_text = scheduler.render_final();
    if let Err(err) = ctx.telegram.edit_message(handle, &final_text).await {
        tracing::warn!("Final edit failed for chat {}: {}", chat_id, err);
    }

    let assistant_text = scheduler.into_text();
    let lock = ctx.commit_lock(chat_id);
    let _guard = lock.lock().await;
    match history::append_exchange_pair(&ctx.db, chat_id, user_text, &assistant_text).await {
        Ok(()) => {
            phase.advance(RelayPhase::Committed, chat_id);
            RelayOutcome::Committed {
                assistant_chars: assistant_text.chars().count(),
            }
        }
        Err(err) => {
            tracing::error!("History commit failed for chat {}: {}", chat_id, err);
            phase.advance(RelayPhase::Failed, chat_id);
            RelayOutcome::Failed(RelayFailure::Commit(err))
        }
    }
}

async fn edit_with_error(ctx: &BotContext, handle: MessageHandle, err: &Error) {
    let annotation = format!("⚠️ Error talking to model: {}", short_diagnostic(err));
    if let Err(edit_err) = ctx.telegram.edit_message(handle, &annotation).await {
        tracing::warn!(
            "Error annotation edit failed for chat {}: {}",
            handle.chat_id,
            edit_err
        );
    }
}

/// Keep chat-facing error text to one short line.
fn short_diagnostic(err: &Error) -> String {
    let text = err.to_string();
    if text.chars().count() > 200 {
        text.chars().take(200).collect()
    } else {
        text
    }
}

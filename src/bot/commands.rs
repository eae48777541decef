//! Slash commands. Anything that parses as a command is handled here;
//! everything else goes through the relay engine.

use anyhow::{Error, Result};

use crate::history;

use super::core::BotContext;

const START_TEXT: &str = "Hi! I remember context across restarts.\n\
/system <persona> - change my style\n\
/reset - clear memory and persona\n\
/model - show the current model";

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Start,
    Ping,
    Model,
    Reset,
    System(Option<&'a str>),
    Unknown(&'a str),
}

/// Parse `/command[@botname] [args]`. Returns `None` for ordinary text,
/// including a bare "/".
pub fn parse_command(text: &str) -> Option<Command<'_>> {
    let rest = text.trim().strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    // Group chats address commands as /command@botname
    let name = head.split('@').next().unwrap_or(head);

    let command = match name {
        "start" => Command::Start,
        "ping" => Command::Ping,
        "model" => Command::Model,
        "reset" => Command::Reset,
        "system" if args.is_empty() => Command::System(None),
        "system" => Command::System(Some(args)),
        _ => Command::Unknown(name),
    };
    Some(command)
}

pub async fn handle_command(
    ctx: &BotContext,
    chat_id: i64,
    command: Command<'_>,
) -> Result<(), Error> {
    match command {
        Command::Start => {
            ctx.telegram.send_message(chat_id, START_TEXT).await?;
        }
        Command::Ping => {
            ctx.telegram.send_message(chat_id, "pong").await?;
        }
        Command::Model => {
            let text = format!("Current model:\n{}", ctx.config.model);
            ctx.telegram.send_message(chat_id, &text).await?;
        }
        Command::Reset => {
            history::reset_conversation(&ctx.db, chat_id).await?;
            ctx.telegram
                .send_message(chat_id, "Memory and persona cleared.")
                .await?;
        }
        Command::System(Some(persona)) => {
            history::set_persona(&ctx.db, chat_id, persona).await?;
            ctx.telegram.send_message(chat_id, "Persona updated.").await?;
        }
        Command::System(None) => {
            let current = history::get_persona(&ctx.db, chat_id)
                .await?
                .unwrap_or_else(|| ctx.config.system_prompt.clone());
            let text = format!("Usage: /system <new persona prompt>\nCurrent: {}", current);
            ctx.telegram.send_message(chat_id, &text).await?;
        }
        Command::Unknown(name) => {
            tracing::debug!("Ignoring unknown command /{} in chat {}", name, chat_id);
        }
    }
    Ok(())
}

use anyhow::{Error, Result};
use tokio_rusqlite::{Connection, params};

use crate::openai::Role;

use super::models::Exchange;

fn role_to_db(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Assistant => "assistant",
        Role::User => "user",
    }
}

fn role_from_db(value: &str) -> Option<Role> {
    match value {
        "assistant" => Some(Role::Assistant),
        "user" => Some(Role::User),
        _ => None,
    }
}

/// Fetch the persona override for a chat. `None` when the chat has no
/// conversation row yet or never set one.
pub async fn get_persona(db: &Connection, chat_id: i64) -> Result<Option<String>, Error> {
    let persona = db
        .call(move |conn| {
            let mut stmt = conn.prepare("SELECT persona FROM conversation WHERE chat_id = ?")?;
            let row: Option<Option<String>> = stmt
                .query_map([chat_id], |row| row.get(0))?
                .filter_map(Result::ok)
                .next();
            Ok(row.flatten())
        })
        .await?;

    Ok(persona)
}

pub async fn set_persona(db: &Connection, chat_id: i64, persona: &str) -> Result<(), Error> {
    let persona = persona.to_owned();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO conversation (chat_id, persona) VALUES (?1, ?2)
             ON CONFLICT (chat_id) DO UPDATE
             SET persona = excluded.persona, updated_at = datetime('now')",
            params![chat_id, persona],
        )?;
        Ok(())
    })
    .await?;

    Ok(())
}

/// Delete a chat's stored messages and persona in one transaction.
pub async fn reset_conversation(db: &Connection, chat_id: i64) -> Result<(), Error> {
    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM message WHERE chat_id = ?", [chat_id])?;
        tx.execute("DELETE FROM conversation WHERE chat_id = ?", [chat_id])?;
        tx.commit()?;
        Ok(())
    })
    .await?;

    Ok(())
}

/// Append one completed (user, assistant) exchange. Both rows land in a
/// single transaction so a reader never observes a user message without
/// its reply.
pub async fn append_exchange_pair(
    db: &Connection,
    chat_id: i64,
    user_text: &str,
    assistant_text: &str,
) -> Result<(), Error> {
    let user_text = user_text.to_owned();
    let assistant_text = assistant_text.to_owned();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO conversation (chat_id) VALUES (?)",
            [chat_id],
        )?;
        tx.execute(
            "INSERT INTO message (chat_id, role, content) VALUES (?1, ?2, ?3)",
            params![chat_id, role_to_db(Role::User), user_text],
        )?;
        tx.execute(
            "INSERT INTO message (chat_id, role, content) VALUES (?1, ?2, ?3)",
            params![chat_id, role_to_db(Role::Assistant), assistant_text],
        )?;
        tx.commit()?;
        Ok(())
    })
    .await?;

    Ok(())
}

/// Fetch the most recent `pairs` exchanges for a chat in chronological
/// order, oldest first.
pub async fn fetch_last_exchanges(
    db: &Connection,
    chat_id: i64,
    pairs: usize,
) -> Result<Vec<Exchange>, Error> {
    let limit = (pairs * 2) as i64;
    let exchanges = db
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT role, content FROM message
                 WHERE chat_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let mut rows: Vec<Exchange> = stmt
                .query_map(params![chat_id, limit], |row| {
                    let role: String = row.get(0)?;
                    let content: String = row.get(1)?;
                    Ok((role, content))
                })?
                .filter_map(Result::ok)
                .filter_map(|(role, content)| {
                    role_from_db(&role).map(|role| Exchange { role, content })
                })
                .collect();
            // Rows come back newest first; callers want them oldest
            // first for prompt assembly
            rows.reverse();
            Ok(rows)
        })
        .await?;

    Ok(exchanges)
}

use anyhow::{Error, Result};
use tokio_rusqlite::Connection;

/// Open the SQLite database at `db_path`, creating the file if needed.
pub async fn async_db(db_path: &str) -> Result<Connection, Error> {
    let db = Connection::open(db_path).await?;
    Ok(db)
}

/// Create the schema if it doesn't already exist. Safe to run on every
/// startup.
pub fn initialize_db(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation (
             chat_id    INTEGER PRIMARY KEY,
             persona    TEXT,
             updated_at TEXT NOT NULL DEFAULT (datetime('now'))
         );
         CREATE TABLE IF NOT EXISTS message (
             id         INTEGER PRIMARY KEY AUTOINCREMENT,
             chat_id    INTEGER NOT NULL REFERENCES conversation (chat_id),
             role       TEXT NOT NULL,
             content    TEXT NOT NULL,
             created_at TEXT NOT NULL DEFAULT (datetime('now'))
         );
         CREATE INDEX IF NOT EXISTS idx_message_chat_created
             ON message (chat_id, created_at);",
    )
}

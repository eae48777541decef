use anyhow::Result;

use crate::core::{async_db, initialize_db};
use crate::history;

const PROBE_CHAT_ID: i64 = 123_456;

/// Connectivity check: write, read, and clear a probe conversation so a
/// broken deployment shows up before the bot goes online.
pub async fn run(db_path: &str) -> Result<()> {
    println!("Connecting to {}...", db_path);
    let db = async_db(db_path).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    println!("Schema OK");

    history::set_persona(&db, PROBE_CHAT_ID, "Probe persona").await?;
    let persona = history::get_persona(&db, PROBE_CHAT_ID).await?;
    println!("Persona round trip: {:?}", persona);

    history::append_exchange_pair(&db, PROBE_CHAT_ID, "probe", "echo").await?;
    let exchanges = history::fetch_last_exchanges(&db, PROBE_CHAT_ID, 6).await?;
    println!("History round trip: {} rows", exchanges.len());

    history::reset_conversation(&db, PROBE_CHAT_ID).await?;
    println!("Probe conversation cleared");

    Ok(())
}

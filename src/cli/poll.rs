use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::{BotContext, handle_update};
use crate::core::{AppConfig, async_db, initialize_db};
use crate::telegram::TelegramClient;

const POLL_TIMEOUT_SECS: u64 = 50;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

pub async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::default();
    let db = async_db(&config.db_path).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;

    let telegram = TelegramClient::new(&config.telegram_token);
    let ctx = Arc::new(BotContext::new(db, config, telegram));

    tracing::info!("Polling for updates");

    let mut offset: i64 = 0;
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            result = ctx.telegram.get_updates(offset, POLL_TIMEOUT_SECS) => {
                match result {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            tasks.spawn(handle_update(Arc::clone(&ctx), update));
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Polling for updates failed: {}", err);
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                }
                // Reap handlers that already finished so the set
                // doesn't grow without bound
                while tasks.try_join_next().is_some() {}
            }
        }
    }

    // Let in-flight requests reach a terminal state before exiting
    if !tasks.is_empty() {
        tracing::info!("Draining {} in-flight request(s)", tasks.len());
        while tasks.join_next().await.is_some() {}
    }
    tracing::info!("Stopped");

    Ok(())
}

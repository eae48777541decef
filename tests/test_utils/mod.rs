//! Test utilities for integration tests
use std::time::Duration;

use tokio_rusqlite::Connection;

use bellhop::bot::BotContext;
use bellhop::core::AppConfig;
use bellhop::core::db::initialize_db;
use bellhop::telegram::TelegramClient;

pub const TEST_TOKEN: &str = "test-token";

/// Path of a Bot API method on the mock Telegram server.
pub fn tg_path(method: &str) -> String {
    format!("/bot{}/{}", TEST_TOKEN, method)
}

/// One SSE content event the way an OpenAI-compatible endpoint streams
/// it.
pub fn sse_content(text: &str) -> String {
    format!(
        "data: {{\"id\":\"c1\",\"object\":\"chat.completion.chunk\",\"choices\":[{{\"index\":0,\"delta\":{{\"content\":{}}},\"finish_reason\":null}}]}}\n\n",
        serde_json::to_string(text).unwrap()
    )
}

pub fn sse_done() -> &'static str {
    "data: [DONE]\n\n"
}

/// Build a bot context against mock servers for the inference API and
/// the Telegram API, backed by a fresh in-memory database.
pub async fn test_context(inference_url: &str, telegram_url: &str) -> BotContext {
    let db = Connection::open_in_memory().await.unwrap();
    db.call(|conn| {
        initialize_db(conn).expect("Failed to initialize db");
        Ok(())
    })
    .await
    .unwrap();

    let config = AppConfig {
        telegram_token: TEST_TOKEN.to_string(),
        api_base: inference_url.to_string(),
        api_key: "test-api-key".to_string(),
        model: "test-model".to_string(),
        db_path: ":memory:".to_string(),
        system_prompt: "You are a helpful assistant.".to_string(),
        history_pairs: 6,
        chars_per_edit: 80,
        edit_interval: Duration::from_millis(350),
    };
    let telegram = TelegramClient::with_api_base(telegram_url, TEST_TOKEN);
    BotContext::new(db, config, telegram)
}

/// Same context with a custom edit cadence for tests that exercise
/// intermediate edits.
pub async fn test_context_with_cadence(
    inference_url: &str,
    telegram_url: &str,
    chars_per_edit: usize,
    edit_interval: Duration,
) -> BotContext {
    let mut ctx = test_context(inference_url, telegram_url).await;
    ctx.config.chars_per_edit = chars_per_edit;
    ctx.config.edit_interval = edit_interval;
    ctx
}

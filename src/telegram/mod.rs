pub mod models;
pub use models::*;

use std::time::Duration;

use anyhow::{Error, Result, anyhow, bail};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimal Telegram Bot API client covering the methods the bot needs:
/// long polling plus sending and editing messages.
#[derive(Clone, Debug)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_api_base(TELEGRAM_API_BASE, token)
    }

    /// Point the client at a different API host. Used by tests.
    pub fn with_api_base(api_base: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<T, Error> {
        let url = format!("{}/bot{}/{}", self.api_base, self.token, method);
        let body: ApiResponse<T> = self
            .http
            .post(url)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if !body.ok {
            bail!(
                "Telegram {} failed: {}",
                method,
                body.description
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        body.result
            .ok_or_else(|| anyhow!("Telegram {} returned no result", method))
    }

    /// Send a plain text message and return a handle for editing it.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<MessageHandle, Error> {
        let message: IncomingMessage = self
            .call(
                "sendMessage",
                json!({"chat_id": chat_id, "text": text}),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(MessageHandle {
            chat_id,
            message_id: message.message_id,
        })
    }

    /// Replace the text of a previously sent message.
    pub async fn edit_message(&self, handle: MessageHandle, text: &str) -> Result<(), Error> {
        // The API returns the edited Message for regular chats; we only
        // care that the call succeeded
        let _: Value = self
            .call(
                "editMessageText",
                json!({
                    "chat_id": handle.chat_id,
                    "message_id": handle.message_id,
                    "text": text,
                }),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(())
    }

    /// Show a chat action, e.g. "typing", in the client UI.
    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<(), Error> {
        let _: bool = self
            .call(
                "sendChatAction",
                json!({"chat_id": chat_id, "action": action}),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(())
    }

    /// Long-poll for updates. Blocks server side for up to
    /// `timeout_secs` when there is nothing to deliver.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, Error> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
            // The HTTP timeout has to outlast the poll window itself
            Duration::from_secs(timeout_secs + 10),
        )
        .await
    }
}

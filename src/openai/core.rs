//! Chat completion client for an OpenAI-compatible inference API using
//! server-sent events for streaming responses.

use std::time::Duration;

use anyhow::{Error, Result};
use async_stream::try_stream;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

const TEMPERATURE: f64 = 0.6;
const MAX_TOKENS: u32 = 512;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Delta {
    Content { content: String },
    // Role announcements, empty deltas, and anything else we don't
    // care about fall through to this variant
    Other {},
}

#[derive(Debug, Deserialize)]
struct CompletionChunkChoice {
    delta: Delta,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    choices: Vec<CompletionChunkChoice>,
}

/// Open a streaming chat completion against `{api_base}/chat/completions`
/// and return a stream of content fragments in arrival order.
///
/// A request that fails before streaming begins (connect error, non-2xx
/// status) surfaces as an `Err` from this function. Once the stream is
/// open, transport errors surface as `Err` items on the stream itself.
/// The stream ends at the `[DONE]` sentinel or when the server closes
/// the response body.
pub async fn stream_chat_completion(
    http: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    model: &str,
    messages: &[Message],
) -> Result<BoxStream<'static, Result<String, Error>>, Error> {
    let payload = json!({
        "model": model,
        "messages": messages,
        "temperature": TEMPERATURE,
        "max_tokens": MAX_TOKENS,
        "stream": true,
    });
    let url = format!("{}/chat/completions", api_base.trim_end_matches('/'));
    let response = http
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 5))
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;

    let mut byte_stream = response.bytes_stream();

    let stream = try_stream! {
        // SSE events can arrive fragmented across HTTP frames, so
        // bytes accumulate here until a full event delimiter shows up.
        // Buffering bytes rather than text also keeps a multi-byte
        // character split across frames from tripping UTF-8 decoding.
        let mut buffer: Vec<u8> = Vec::new();

        'outer: while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);

            // Process all complete SSE events in the buffer
            while let Some(event_end) = buffer.windows(2).position(|w| w == b"\n\n") {
                let event_bytes: Vec<u8> = buffer.drain(..event_end + 2).collect();
                let Ok(event_data) = std::str::from_utf8(&event_bytes[..event_end]) else {
                    continue;
                };

                let event_data = event_data.trim();
                if event_data.is_empty() {
                    continue;
                }
                if !event_data.starts_with("data: ") {
                    continue;
                }

                let data = event_data[6..].trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    break 'outer;
                }

                // Lines that don't parse as a completion chunk are
                // dropped rather than ending the stream
                let chunk = match serde_json::from_str::<CompletionChunk>(data) {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        tracing::debug!("Skipping unparseable stream event: {}", err);
                        continue;
                    }
                };

                let Some(choice) = chunk.choices.first() else {
                    continue;
                };
                if let Delta::Content { content } = &choice.delta {
                    if !content.is_empty() {
                        yield content.clone();
                    }
                }
            }
        }
    };

    Ok(Box::pin(stream))
}

use std::env;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "./bellhop.db";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are Bellhop, a helpful but concise assistant for Telegram.";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram_token: String,
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub db_path: String,
    pub system_prompt: String,
    pub history_pairs: usize,
    pub chars_per_edit: usize,
    pub edit_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        let telegram_token = env::var("BELLHOP_TELEGRAM_TOKEN")
            .expect("Missing env var BELLHOP_TELEGRAM_TOKEN");
        let api_base =
            env::var("BELLHOP_API_BASE").expect("Missing env var BELLHOP_API_BASE");
        let api_key = env::var("BELLHOP_API_KEY").expect("Missing env var BELLHOP_API_KEY");
        let model = env::var("BELLHOP_MODEL").expect("Missing env var BELLHOP_MODEL");
        let db_path =
            env::var("BELLHOP_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        let system_prompt = env::var("BELLHOP_SYSTEM_PROMPT")
            .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string());
        let history_pairs = env_usize("BELLHOP_HISTORY_PAIRS", 6);
        let chars_per_edit = env_usize("BELLHOP_EDIT_CHARS", 80).max(1);
        let edit_interval =
            Duration::from_millis(env_usize("BELLHOP_EDIT_INTERVAL_MS", 350) as u64);

        Self {
            telegram_token,
            api_base,
            api_key,
            model,
            db_path,
            system_prompt,
            history_pairs,
            chars_per_edit,
            edit_interval,
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub mod bot;
pub mod cli;
pub mod core;
pub mod history;
pub mod openai;
pub mod telegram;

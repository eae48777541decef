pub mod config;
pub mod db;
pub use config::*;
pub use db::*;

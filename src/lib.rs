pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{CpalCapture, DiscordVoice};
pub use config::settings::{RunMode, StreamSettings, Token};
pub use config::{toml_config::TomlConfig, CliConfig};
pub use core::engine::StreamEngine;
pub use utils::error::{MelodiqaError, Result};

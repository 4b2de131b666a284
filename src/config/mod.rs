pub mod settings;
pub mod toml_config;

use crate::config::settings::Token;
use crate::utils::logger::LogFormat;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

pub const ENV_VAR_DISCORD_TOKEN: &str = "MELODIQA_DISCORD_TOKEN";

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "melodiqa", version)]
#[command(
    about = "Streams audio from an audio input device to a voice channel in a Discord server"
)]
#[command(group(ArgGroup::new("device_key").args(["device_name", "device_index"])))]
#[command(group(ArgGroup::new("discord_token").args(["token", "use_environment_variable"])))]
pub struct CliConfig {
    /// Discord server id
    #[arg(value_name = "GUILD_ID")]
    pub guild_id: Option<u64>,

    /// Discord voice channel id
    #[arg(value_name = "CHANNEL_ID")]
    pub channel_id: Option<u64>,

    /// Print available audio devices
    #[arg(short = 'd', long)]
    pub print_devices: bool,

    /// Print the device list as JSON on stdout
    #[arg(long, requires = "print_devices")]
    pub json: bool,

    #[arg(short = 'n', long, value_name = "DEVICE_NAME")]
    pub device_name: Option<String>,

    #[arg(short = 'i', long, value_name = "DEVICE_INDEX")]
    pub device_index: Option<usize>,

    #[arg(short = 't', long, value_name = "TOKEN")]
    pub token: Option<Token>,

    /// Read the bot token from MELODIQA_DISCORD_TOKEN
    #[arg(short = 'e', long)]
    pub use_environment_variable: bool,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Audio host to capture from (alsa, jack, wasapi, asio, coreaudio, ...)
    #[arg(long, value_name = "HOST")]
    pub audio_host: Option<String>,

    /// Frames buffered between capture and Discord (20 ms each)
    #[arg(long, value_name = "FRAMES")]
    pub queue_frames: Option<usize>,

    /// Log process CPU and memory usage with the stream statistics
    #[arg(long)]
    pub monitor: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, value_enum, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
}

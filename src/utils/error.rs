use thiserror::Error;

#[derive(Error, Debug)]
pub enum MelodiqaError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cannot read configuration file {path}: {source}")]
    ConfigFileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error in {path}: {message}")]
    TomlParseError { path: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Audio device name not found: {name}")]
    DeviceNotFound { name: String },

    #[error("Audio device index out of range: {index} (available: {available})")]
    DeviceIndexOutOfRange { index: usize, available: usize },

    #[error("Audio host error: {message}")]
    AudioHostError { message: String },

    #[error("Failed to open audio device: {message}")]
    CaptureError { message: String },

    #[error("Discord error: {0}")]
    DiscordError(#[from] serenity::Error),

    #[error("Guild not found: {guild_id}")]
    GuildNotFound { guild_id: u64 },

    #[error("Voice channel not found: {channel_id} (guild {guild_id})")]
    ChannelNotFound { guild_id: u64, channel_id: u64 },

    #[error("Failed to join voice channel: {message}")]
    VoiceJoinError { message: String },

    #[error("Discord session was not ready within {seconds}s")]
    ReadyTimeout { seconds: u64 },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Device,
    Discord,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl MelodiqaError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigFileReadError { .. }
            | Self::TomlParseError { .. }
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::DeviceNotFound { .. }
            | Self::DeviceIndexOutOfRange { .. }
            | Self::AudioHostError { .. }
            | Self::CaptureError { .. } => ErrorCategory::Device,
            Self::DiscordError(_)
            | Self::GuildNotFound { .. }
            | Self::ChannelNotFound { .. }
            | Self::VoiceJoinError { .. }
            | Self::ReadyTimeout { .. } => ErrorCategory::Discord,
            Self::IoError(_) | Self::SerializationError(_) | Self::InternalError { .. } => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Device => ErrorSeverity::High,
            ErrorCategory::Discord => match self {
                Self::ReadyTimeout { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Process exit code. Usage errors (exit 2) are reported by clap before
    /// any of these exist.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium | ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingConfigError { field } if field == "token" => {
                "No Discord bot token was provided".to_string()
            }
            Self::DeviceNotFound { name } => format!("Audio device '{}' does not exist", name),
            Self::DeviceIndexOutOfRange { index, available } => format!(
                "Audio device #{} does not exist, {} device(s) available",
                index, available
            ),
            Self::GuildNotFound { guild_id } => {
                format!("The bot is not a member of server {}", guild_id)
            }
            Self::ChannelNotFound { channel_id, .. } => {
                format!("Channel {} is not a voice channel of that server", channel_id)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MissingConfigError { field } if field == "token" => {
                "Pass --token, or set MELODIQA_DISCORD_TOKEN and pass -e"
            }
            Self::MissingConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Check the command line arguments and the configuration file"
            }
            Self::ConfigFileReadError { .. } => "Check the --config path and its permissions",
            Self::TomlParseError { .. } | Self::ConfigError { .. } => {
                "Fix the configuration file syntax; see melodiqa.example.toml"
            }
            Self::DeviceNotFound { .. } | Self::DeviceIndexOutOfRange { .. } => {
                "Run with --print-devices to list available audio devices"
            }
            Self::AudioHostError { .. } => "Omit --audio-host to use the default audio host",
            Self::CaptureError { .. } => {
                "Make sure the device is not in exclusive use by another application"
            }
            Self::DiscordError(_) => "Check the bot token and network connectivity",
            Self::GuildNotFound { .. } => "Invite the bot to the server first",
            Self::ChannelNotFound { .. } => {
                "Use the id of a voice or stage channel in the given server"
            }
            Self::VoiceJoinError { .. } => {
                "Make sure the bot has the Connect and Speak permissions"
            }
            Self::ReadyTimeout { .. } => "Retry later; Discord may be degraded",
            Self::IoError(_) | Self::SerializationError(_) | Self::InternalError { .. } => {
                "Re-run with --verbose and report the log output"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MelodiqaError>;

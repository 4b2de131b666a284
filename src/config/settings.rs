use crate::config::toml_config::TomlConfig;
use crate::config::{CliConfig, ENV_VAR_DISCORD_TOKEN};
use crate::domain::model::{DeviceSelector, VoiceTarget};
use crate::utils::error::{MelodiqaError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_required_field, validate_snowflake,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_QUEUE_FRAMES: usize = 50;
pub const DEFAULT_UNDERRUN_WAIT_MS: u64 = 5;
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 30;

/// Discord bot token. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

impl FromStr for Token {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub enum RunMode {
    ListDevices {
        audio_host: Option<String>,
        json: bool,
    },
    Stream(StreamSettings),
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub token: Token,
    pub target: VoiceTarget,
    pub device: DeviceSelector,
    pub audio_host: Option<String>,
    pub queue_frames: usize,
    pub underrun_wait: Duration,
    pub stats_interval: Duration,
    pub monitor: bool,
    pub ready_timeout: Duration,
}

impl RunMode {
    pub fn resolve(cli: &CliConfig, file: Option<&TomlConfig>) -> Result<Self> {
        Self::resolve_with_env(cli, file, |name| std::env::var(name).ok())
    }

    /// `env` looks up environment variables; tests pass a closure instead of
    /// touching the process environment.
    pub fn resolve_with_env(
        cli: &CliConfig,
        file: Option<&TomlConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let defaults = TomlConfig::default();
        let file = file.unwrap_or(&defaults);
        file.validate()?;

        let audio_host = cli.audio_host.clone().or_else(|| file.audio.host.clone());

        if cli.print_devices {
            return Ok(Self::ListDevices {
                audio_host,
                json: cli.json,
            });
        }

        let device = match (&cli.device_name, cli.device_index) {
            (Some(name), _) => DeviceSelector::Name(name.clone()),
            (None, Some(index)) => DeviceSelector::Index(index),
            (None, None) => file
                .device_selector()
                .ok_or_else(|| MelodiqaError::MissingConfigError {
                    field: "device (--device-name or --device-index)".to_string(),
                })?,
        };

        let guild_id = cli.guild_id.or(file.discord.guild_id);
        let channel_id = cli.channel_id.or(file.discord.channel_id);
        let guild_id = *validate_required_field("guild_id", &guild_id)?;
        let channel_id = *validate_required_field("channel_id", &channel_id)?;
        validate_snowflake("guild_id", guild_id)?;
        validate_snowflake("channel_id", channel_id)?;

        let token = resolve_token(cli, file, &env)?;

        let queue_frames = cli
            .queue_frames
            .or(file.audio.queue_frames)
            .unwrap_or(DEFAULT_QUEUE_FRAMES);
        validate_range("queue_frames", queue_frames, 2, 1500)?;

        let underrun_wait_ms = file
            .audio
            .underrun_wait_ms
            .unwrap_or(DEFAULT_UNDERRUN_WAIT_MS);

        Ok(Self::Stream(StreamSettings {
            token,
            target: VoiceTarget {
                guild_id,
                channel_id,
            },
            device,
            audio_host,
            queue_frames,
            underrun_wait: Duration::from_millis(underrun_wait_ms),
            stats_interval: Duration::from_secs(
                file.monitoring
                    .stats_interval_secs
                    .unwrap_or(DEFAULT_STATS_INTERVAL_SECS),
            ),
            monitor: cli.monitor || file.monitoring.enabled.unwrap_or(false),
            ready_timeout: Duration::from_secs(
                file.discord
                    .ready_timeout_secs
                    .unwrap_or(DEFAULT_READY_TIMEOUT_SECS),
            ),
        }))
    }
}

/// `-t` wins, then `-e`, then the file's `token`, then the file's `token_env`.
fn resolve_token(
    cli: &CliConfig,
    file: &TomlConfig,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<Token> {
    let token = if let Some(token) = &cli.token {
        Some(token.clone())
    } else if cli.use_environment_variable {
        env(ENV_VAR_DISCORD_TOKEN).map(Token)
    } else if let Some(token) = &file.discord.token {
        Some(token.clone())
    } else {
        file.discord
            .token_env
            .as_deref()
            .and_then(|name| env(name))
            .map(Token)
    };

    let token = token.ok_or_else(|| MelodiqaError::MissingConfigError {
        field: "token".to_string(),
    })?;
    if validate_non_empty_string("token", token.expose()).is_err() {
        return Err(MelodiqaError::MissingConfigError {
            field: "token".to_string(),
        });
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_cli() -> CliConfig {
        CliConfig {
            guild_id: Some(10),
            channel_id: Some(20),
            device_index: Some(0),
            token: Some(Token::new("cli-token")),
            ..Default::default()
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn stream(mode: RunMode) -> StreamSettings {
        match mode {
            RunMode::Stream(settings) => settings,
            other => panic!("expected stream mode, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let settings = stream(RunMode::resolve_with_env(&stream_cli(), None, no_env).unwrap());

        assert_eq!(settings.token.expose(), "cli-token");
        assert_eq!(settings.target.guild_id, 10);
        assert_eq!(settings.device, DeviceSelector::Index(0));
        assert_eq!(settings.queue_frames, DEFAULT_QUEUE_FRAMES);
        assert_eq!(settings.underrun_wait, Duration::from_millis(5));
        assert!(!settings.monitor);
    }

    #[test]
    fn test_print_devices_needs_nothing_else() {
        let cli = CliConfig {
            print_devices: true,
            audio_host: Some("alsa".into()),
            ..Default::default()
        };
        let mode = RunMode::resolve_with_env(&cli, None, no_env).unwrap();
        assert!(matches!(
            mode,
            RunMode::ListDevices { audio_host: Some(ref host), json: false } if host == "alsa"
        ));
    }

    #[test]
    fn test_token_from_environment() {
        let cli = CliConfig {
            token: None,
            use_environment_variable: true,
            ..stream_cli()
        };
        let env = |name: &str| (name == ENV_VAR_DISCORD_TOKEN).then(|| "env-token".to_string());
        let settings = stream(RunMode::resolve_with_env(&cli, None, env).unwrap());
        assert_eq!(settings.token.expose(), "env-token");
    }

    #[test]
    fn test_missing_environment_token() {
        let cli = CliConfig {
            token: None,
            use_environment_variable: true,
            ..stream_cli()
        };
        let err = RunMode::resolve_with_env(&cli, None, no_env).unwrap_err();
        assert!(matches!(err, MelodiqaError::MissingConfigError { ref field } if field == "token"));
    }

    #[test]
    fn test_blank_token_is_missing() {
        let cli = CliConfig {
            token: Some(Token::new("  ")),
            ..stream_cli()
        };
        assert!(RunMode::resolve_with_env(&cli, None, no_env).is_err());
    }

    #[test]
    fn test_file_fills_gaps_and_cli_wins() {
        let file = TomlConfig::from_toml_str(
            r#"
[discord]
guild_id = 111
channel_id = 222
token_env = "MY_BOT_TOKEN"

[audio]
device_name = "Line In"
queue_frames = 10

[monitoring]
enabled = true
"#,
        )
        .unwrap();

        let cli = CliConfig {
            channel_id: Some(333),
            ..Default::default()
        };
        let env = |name: &str| (name == "MY_BOT_TOKEN").then(|| "file-env-token".to_string());
        let settings = stream(RunMode::resolve_with_env(&cli, Some(&file), env).unwrap());

        assert_eq!(settings.target.guild_id, 111);
        assert_eq!(settings.target.channel_id, 333);
        assert_eq!(settings.device, DeviceSelector::Name("Line In".into()));
        assert_eq!(settings.token.expose(), "file-env-token");
        assert_eq!(settings.queue_frames, 10);
        assert!(settings.monitor);
    }

    #[test]
    fn test_cli_token_wins_over_file_token() {
        let file = TomlConfig::from_toml_str("[discord]\ntoken = \"file-token\"\n").unwrap();
        let settings = stream(RunMode::resolve_with_env(&stream_cli(), Some(&file), no_env).unwrap());
        assert_eq!(settings.token.expose(), "cli-token");
    }

    #[test]
    fn test_environment_flag_wins_over_file_token() {
        let cli = CliConfig {
            token: None,
            use_environment_variable: true,
            ..stream_cli()
        };
        let env = |name: &str| match name {
            ENV_VAR_DISCORD_TOKEN => Some("env-token".to_string()),
            "MY_BOT_TOKEN" => Some("file-env-token".to_string()),
            _ => None,
        };

        let with_token = TomlConfig::from_toml_str("[discord]\ntoken = \"file-token\"\n").unwrap();
        let settings = stream(RunMode::resolve_with_env(&cli, Some(&with_token), env).unwrap());
        assert_eq!(settings.token.expose(), "env-token");

        let with_token_env =
            TomlConfig::from_toml_str("[discord]\ntoken_env = \"MY_BOT_TOKEN\"\n").unwrap();
        let settings = stream(RunMode::resolve_with_env(&cli, Some(&with_token_env), env).unwrap());
        assert_eq!(settings.token.expose(), "env-token");
    }

    #[test]
    fn test_missing_device() {
        let cli = CliConfig {
            device_index: None,
            ..stream_cli()
        };
        let err = RunMode::resolve_with_env(&cli, None, no_env).unwrap_err();
        assert!(matches!(err, MelodiqaError::MissingConfigError { .. }));
    }

    #[test]
    fn test_zero_guild_rejected() {
        let cli = CliConfig {
            guild_id: Some(0),
            ..stream_cli()
        };
        let err = RunMode::resolve_with_env(&cli, None, no_env).unwrap_err();
        assert!(matches!(err, MelodiqaError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_queue_frames_range() {
        let cli = CliConfig {
            queue_frames: Some(1),
            ..stream_cli()
        };
        assert!(RunMode::resolve_with_env(&cli, None, no_env).is_err());
    }
}

use crate::config::settings::Token;
use crate::domain::model::DeviceSelector;
use crate::utils::error::{MelodiqaError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{validate_one_of, validate_range, Validate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub guild_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub token: Option<Token>,
    /// Name of an environment variable holding the token.
    pub token_env: Option<String>,
    pub ready_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioConfig {
    pub device_name: Option<String>,
    pub device_index: Option<usize>,
    pub host: Option<String>,
    pub queue_frames: Option<usize>,
    pub underrun_wait_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: Option<bool>,
    pub stats_interval_secs: Option<u64>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let origin = path.as_ref().display().to_string();
        let content = std::fs::read_to_string(&path).map_err(|source| {
            MelodiqaError::ConfigFileReadError {
                path: origin.clone(),
                source,
            }
        })?;
        Self::parse(&content, &origin)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| MelodiqaError::TomlParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn device_selector(&self) -> Option<DeviceSelector> {
        match (&self.audio.device_name, self.audio.device_index) {
            (Some(name), _) => Some(DeviceSelector::Name(name.clone())),
            (None, Some(index)) => Some(DeviceSelector::Index(index)),
            (None, None) => None,
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if self.audio.device_name.is_some() && self.audio.device_index.is_some() {
            return Err(MelodiqaError::config(
                "audio.device_name and audio.device_index are mutually exclusive",
            ));
        }
        if self.discord.token.is_some() && self.discord.token_env.is_some() {
            return Err(MelodiqaError::config(
                "discord.token and discord.token_env are mutually exclusive",
            ));
        }
        if let Some(frames) = self.audio.queue_frames {
            validate_range("audio.queue_frames", frames, 2, 1500)?;
        }
        if let Some(wait) = self.audio.underrun_wait_ms {
            validate_range("audio.underrun_wait_ms", wait, 0, 20)?;
        }
        if let Some(secs) = self.monitoring.stats_interval_secs {
            validate_range("monitoring.stats_interval_secs", secs, 1, 86_400)?;
        }
        if let Some(secs) = self.discord.ready_timeout_secs {
            validate_range("discord.ready_timeout_secs", secs, 1, 600)?;
        }
        if let Some(level) = &self.logging.level {
            validate_one_of("logging.level", level, &LOG_LEVELS)?;
        }
        Ok(())
    }
}

/// Replaces `${NAME}` with the environment variable `NAME`. Unknown variables
/// are left as written.
fn substitute_env_vars(content: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    });

    re.replace_all(content, |caps: &Captures| {
        let name = &caps[1];
        std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let config = TomlConfig::from_toml_str(
            r#"
[discord]
guild_id = 81384788765712384
channel_id = 81384788765712385
token_env = "MELODIQA_DISCORD_TOKEN"

[audio]
device_index = 1
host = "alsa"
queue_frames = 25

[logging]
level = "debug"
format = "json"

[monitoring]
enabled = true
stats_interval_secs = 30
"#,
        )
        .unwrap();

        assert_eq!(config.discord.guild_id, Some(81384788765712384));
        assert_eq!(config.device_selector(), Some(DeviceSelector::Index(1)));
        assert_eq!(config.logging.format, Some(LogFormat::Json));
        assert_eq!(config.monitoring.stats_interval_secs, Some(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.device_selector().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("MELODIQA_TEST_DEVICE", "Stereo Mix");

        let config = TomlConfig::from_toml_str(
            r#"
[audio]
device_name = "${MELODIQA_TEST_DEVICE}"
host = "${MELODIQA_TEST_UNSET_HOST}"
"#,
        )
        .unwrap();

        assert_eq!(config.audio.device_name.as_deref(), Some("Stereo Mix"));
        assert_eq!(
            config.audio.host.as_deref(),
            Some("${MELODIQA_TEST_UNSET_HOST}")
        );

        std::env::remove_var("MELODIQA_TEST_DEVICE");
    }

    #[test]
    fn test_config_validation() {
        let both_devices = TomlConfig::from_toml_str(
            r#"
[audio]
device_name = "Mic"
device_index = 0
"#,
        )
        .unwrap();
        assert!(both_devices.validate().is_err());

        let bad_level = TomlConfig::from_toml_str(
            r#"
[logging]
level = "loud"
"#,
        )
        .unwrap();
        assert!(bad_level.validate().is_err());

        let bad_wait = TomlConfig::from_toml_str(
            r#"
[audio]
underrun_wait_ms = 50
"#,
        )
        .unwrap();
        assert!(bad_wait.validate().is_err());
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = TomlConfig::from_toml_str("[discord\nguild_id = 1").unwrap_err();
        assert!(matches!(err, MelodiqaError::TomlParseError { ref path, .. } if path == "<inline>"));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[discord]\nguild_id = 42\nchannel_id = 43\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.discord.guild_id, Some(42));
        assert_eq!(config.discord.channel_id, Some(43));
    }

    #[test]
    fn test_missing_config_file_is_a_configuration_error() {
        use crate::utils::error::ErrorCategory;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = TomlConfig::from_file(&path).unwrap_err();

        assert!(matches!(err, MelodiqaError::ConfigFileReadError { .. }));
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.exit_code(), 1);
        assert!(err
            .user_friendly_message()
            .contains(&path.display().to_string()));
    }

    #[test]
    fn test_shipped_example_config_is_valid() {
        let config =
            TomlConfig::from_toml_str(include_str!("../../melodiqa.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.device_selector(),
            Some(DeviceSelector::Name("Microphone".to_string()))
        );
        assert_eq!(config.audio.queue_frames, Some(50));
    }
}

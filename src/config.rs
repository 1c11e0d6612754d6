use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::{ChatId, UserId};

use crate::translator::language::Language;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Z.AI API key for the translation model
    zai_api_key: String,
    /// Users allowed to run admin commands
    #[serde(default)]
    admin_ids: Vec<u64>,
    /// If non-empty, only these users may use the bot
    #[serde(default)]
    allowed_users: Vec<u64>,
    #[serde(default = "default_language")]
    default_language: String,
    #[serde(default = "default_max_message_length")]
    max_message_length: usize,
    #[serde(default = "default_true")]
    enable_stats: bool,
    #[serde(default = "default_model")]
    model: String,
    /// Override for the chat completions endpoint.
    api_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    /// Chat that receives warnings and errors.
    log_chat_id: Option<i64>,
    /// Directory for state files (logs, database). Defaults to current directory.
    data_dir: Option<String>,
}

fn default_language() -> String {
    "vi".to_string()
}

fn default_max_message_length() -> usize {
    4000
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "glm-4.5-flash".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

pub struct Config {
    pub telegram_bot_token: String,
    pub zai_api_key: String,
    pub admin_ids: HashSet<UserId>,
    /// Empty means everyone.
    pub allowed_users: HashSet<UserId>,
    /// Always a supported language code.
    pub default_language: String,
    pub max_message_length: usize,
    pub enable_stats: bool,
    pub model: String,
    pub api_url: Option<String>,
    pub request_timeout: Duration,
    pub log_chat_id: Option<ChatId>,
    /// Directory for state files (logs, database).
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.zai_api_key.trim().is_empty() {
            return Err(ConfigError::Validation("zai_api_key is required".into()));
        }
        let default_language = Language::from_code(&file.default_language)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "default_language '{}' is not supported (expected one of: {})",
                    file.default_language,
                    Language::all().iter().map(|l| l.code).collect::<Vec<_>>().join(", ")
                ))
            })?
            .code
            .to_string();
        if file.max_message_length == 0 {
            return Err(ConfigError::Validation("max_message_length must be positive".into()));
        }
        if file.request_timeout_secs == 0 {
            return Err(ConfigError::Validation("request_timeout_secs must be positive".into()));
        }
        if file.model.trim().is_empty() {
            return Err(ConfigError::Validation("model must not be empty".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            zai_api_key: file.zai_api_key,
            admin_ids: file.admin_ids.into_iter().map(UserId).collect(),
            allowed_users: file.allowed_users.into_iter().map(UserId).collect(),
            default_language,
            max_message_length: file.max_message_length,
            enable_stats: file.enable_stats,
            model: file.model,
            api_url: file.api_url,
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            log_chat_id: file.log_chat_id.map(ChatId),
            data_dir,
        })
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Admins are always allowed.
    pub fn is_allowed(&self, user_id: UserId) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user_id) || self.is_admin(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "zai_api_key": "zai-key"
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.default_language, "vi");
        assert_eq!(config.max_message_length, 4000);
        assert!(config.enable_stats);
        assert_eq!(config.model, "glm-4.5-flash");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.api_url.is_none());
        assert!(config.log_chat_id.is_none());
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_full_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "zai_api_key": "zai-key",
            "admin_ids": [1],
            "allowed_users": [2, 3],
            "default_language": "EN",
            "max_message_length": 1000,
            "enable_stats": false,
            "model": "glm-4.6",
            "api_url": "http://localhost:8080/v1/chat/completions",
            "request_timeout_secs": 15,
            "log_chat_id": -100123,
            "data_dir": "/var/lib/translator"
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.default_language, "en");
        assert_eq!(config.max_message_length, 1000);
        assert!(!config.enable_stats);
        assert_eq!(config.log_chat_id, Some(ChatId(-100123)));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.is_admin(UserId(1)));
        assert!(!config.is_admin(UserId(2)));
    }

    #[test]
    fn test_access_control() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "zai_api_key": "k",
            "admin_ids": [1],
            "allowed_users": [2]
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert!(config.is_allowed(UserId(1)));
        assert!(config.is_allowed(UserId(2)));
        assert!(!config.is_allowed(UserId(3)));
    }

    #[test]
    fn test_open_access_when_no_allowlist() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "zai_api_key": "k"
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert!(config.is_allowed(UserId(999)));
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{
            "telegram_bot_token": "",
            "zai_api_key": "k"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["invalid_token_no_colon", "notanumber:ABCdef", "123456789:"] {
            let file = write_config(&format!(
                r#"{{ "telegram_bot_token": "{token}", "zai_api_key": "k" }}"#
            ));
            let err = assert_err(Config::load(file.path()));
            assert!(matches!(err, ConfigError::Validation(_)), "{token}");
        }
    }

    #[test]
    fn test_missing_api_key() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "zai_api_key": "   "
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("zai_api_key"));
    }

    #[test]
    fn test_unsupported_default_language() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "zai_api_key": "k",
            "default_language": "tlh"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("tlh"));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "zai_api_key": "k",
            "max_message_length": 0
        }"#);
        assert!(matches!(assert_err(Config::load(file.path())), ConfigError::Validation(_)));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_missing_required_field_is_parse_error() {
        let file = write_config(r#"{ "telegram_bot_token": "123456789:ABCdef" }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}

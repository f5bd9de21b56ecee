use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const APP_NAME: &str = "sol";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const PLACEHOLDER_KEY: &str = "COLE_SUA_CHAVE_AQUI";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_KEY.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 500,
            temperature: 0.7,
            timeout_secs: 20,
        }
    }
}

impl LlmConfig {
    /// True when a real credential is present.
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != PLACEHOLDER_KEY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub max_history_days: u32,
    pub privacy_mode: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_history_days: 30,
            privacy_mode: false,
        }
    }
}

impl HistoryConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| get_data_dir().join("history"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub safe_mode: bool,
    pub debug_mode: bool,
    pub llm: LlmConfig,
    pub history: HistoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            safe_mode: true,
            debug_mode: false,
            llm: LlmConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn get_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("SOL_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("config.toml")
}

/// Missing file means defaults; a present but broken file is an error.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.safe_mode);
        assert!(!config.llm.is_configured());
        assert_eq!(config.history.max_history_days, 30);
        assert_eq!(config.llm.max_tokens, 500);
    }

    #[test]
    fn test_placeholder_and_blank_keys_are_not_configured() {
        let mut llm = LlmConfig::default();
        llm.api_key = "   ".into();
        assert!(!llm.is_configured());
        llm.api_key = "sk-test".into();
        assert!(llm.is_configured());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("safe_mode = false\n[llm]\napi_key = \"k\"\n").unwrap();
        assert!(!config.safe_mode);
        assert_eq!(config.llm.api_key, "k");
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert!(config.history.enabled);
    }

    #[test]
    fn test_save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.safe_mode = false;
        config.history.privacy_mode = true;
        save_config(&config, &path).unwrap();
        assert_eq!(read_config(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default_and_broken_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(read_config(&path).unwrap(), Config::default());

        fs::write(&path, "safe_mode = [").unwrap();
        assert!(matches!(read_config(&path), Err(ConfigError::Parse { .. })));
    }
}

use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_dataset_path() -> String {
    "data/TSLA.csv".into()
}

fn default_symbol() -> String {
    "TSLA".into()
}

fn default_bind() -> String {
    "127.0.0.1:3000".into()
}

fn default_chart_height() -> u32 {
    600
}

fn default_model() -> String {
    "gemini-pro".into()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}

fn default_requests_per_minute() -> u32 {
    30
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_path")]
    pub path: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            symbol: default_symbol(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            chart_height: default_chart_height(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_log_format(config)?;
    validate_dataset(config)?;
    validate_server(config)?;
    validate_assistant(config)?;
    Ok(())
}

fn validate_log_format(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if !VALID_LOG_FORMATS.contains(&config.general.log_format.as_str()) {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "general.log_format \"{}\" is not valid (expected \"text\" or \"json\")",
                config.general.log_format
            ),
        }));
    }
    Ok(())
}

fn validate_dataset(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.dataset.path.trim().is_empty() {
        return Err(Report::new(ConfigError::Validation {
            field: "dataset.path must not be empty".into(),
        }));
    }
    if config.dataset.symbol.trim().is_empty() {
        return Err(Report::new(ConfigError::Validation {
            field: "dataset.symbol must not be empty".into(),
        }));
    }
    Ok(())
}

fn validate_server(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.server.bind.parse::<std::net::SocketAddr>().is_err() {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "server.bind \"{}\" is not a valid socket address",
                config.server.bind
            ),
        }));
    }
    if config.server.chart_height == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "server.chart_height must be greater than zero".into(),
        }));
    }
    Ok(())
}

fn validate_assistant(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.assistant.model.trim().is_empty() {
        return Err(Report::new(ConfigError::Validation {
            field: "assistant.model must not be empty".into(),
        }));
    }
    if config.assistant.api_key_env.trim().is_empty() {
        return Err(Report::new(ConfigError::Validation {
            field: "assistant.api_key_env must not be empty".into(),
        }));
    }
    if config.assistant.requests_per_minute == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "assistant.requests_per_minute must be greater than zero".into(),
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        toml::from_str(toml).expect("parse failed")
    }

    #[test]
    fn valid_full_config_parses() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "json"

[dataset]
path = "/tmp/TSLA.csv"
symbol = "TSLA"

[server]
bind = "0.0.0.0:8080"
chart_height = 480

[assistant]
model = "gemini-pro"
base_url = "https://generativelanguage.googleapis.com"
api_key_env = "GEMINI_API_KEY"
requests_per_minute = 10
"#;
        let config = parse(toml);
        assert!(validate(&config).is_ok());
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.dataset.symbol, "TSLA");
        assert_eq!(config.server.chart_height, 480);
        assert_eq!(config.assistant.requests_per_minute, 10);
    }

    #[test]
    fn defaults_applied_when_sections_omitted() {
        let config = parse("");
        assert!(validate(&config).is_ok());
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "text");
        assert_eq!(config.dataset.path, "data/TSLA.csv");
        assert_eq!(config.dataset.symbol, "TSLA");
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.server.chart_height, 600);
        assert_eq!(config.assistant.model, "gemini-pro");
        assert_eq!(config.assistant.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.assistant.requests_per_minute, 30);
    }

    #[test]
    fn invalid_log_format_rejected() {
        let config = parse(
            r#"
[general]
log_format = "yaml"
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn invalid_bind_address_rejected() {
        let config = parse(
            r#"
[server]
bind = "not-an-address"
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_chart_height_rejected() {
        let config = parse(
            r#"
[server]
chart_height = 0
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn empty_symbol_rejected() {
        let config = parse(
            r#"
[dataset]
symbol = ""
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_request_rate_rejected() {
        let config = parse(
            r#"
[assistant]
requests_per_minute = 0
"#,
        );
        assert!(validate(&config).is_err());
    }
}

//! Layered configuration: defaults, then `leadflow.toml`, then `LEADFLOW_*` variables.
//!
//! File keys and environment variables are both resolved through [`SETTINGS`], so a
//! value is parsed the same way whichever layer supplies it.

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_LOCATIONS: [&str; 2] = ["leadflow.toml", "config/leadflow.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

/// Tuning for orchestrator runs and the tools they expose.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Follow-up attempts after a run that skipped a mandatory tool. Only 0 or 1.
    pub max_retries: u32,
    pub product_search_limit: usize,
    pub product_min_score: f64,
    pub partner_radius_km: u32,
    pub partner_limit: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
    /// Replays a fixed script; used for dry runs and tests.
    Scripted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Explicit config file, which must exist. Without one the default locations are
    /// tried and a missing file just means defaults.
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid value for `{key}` from {origin}: {reason}")]
    InvalidValue { key: &'static str, origin: String, reason: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// A configurable value: its dotted key in the config file and its environment variable.
pub struct Setting {
    pub key: &'static str,
    pub env: &'static str,
    store: fn(&mut AppConfig, &str) -> Result<(), String>,
}

pub const SETTINGS: &[Setting] = &[
    Setting {
        key: "database.url",
        env: "LEADFLOW_DATABASE_URL",
        store: |config, raw| assign_text(&mut config.database.url, raw),
    },
    Setting {
        key: "database.max_connections",
        env: "LEADFLOW_DATABASE_MAX_CONNECTIONS",
        store: |config, raw| assign(&mut config.database.max_connections, raw),
    },
    Setting {
        key: "database.timeout_secs",
        env: "LEADFLOW_DATABASE_TIMEOUT_SECS",
        store: |config, raw| assign(&mut config.database.timeout_secs, raw),
    },
    Setting {
        key: "llm.provider",
        env: "LEADFLOW_LLM_PROVIDER",
        store: |config, raw| assign(&mut config.llm.provider, raw),
    },
    Setting {
        key: "llm.api_key",
        env: "LEADFLOW_LLM_API_KEY",
        store: |config, raw| {
            config.llm.api_key = Some(SecretString::from(raw.trim().to_string()));
            Ok(())
        },
    },
    Setting {
        key: "llm.base_url",
        env: "LEADFLOW_LLM_BASE_URL",
        store: |config, raw| {
            config.llm.base_url = Some(raw.trim().to_string());
            Ok(())
        },
    },
    Setting {
        key: "llm.model",
        env: "LEADFLOW_LLM_MODEL",
        store: |config, raw| assign_text(&mut config.llm.model, raw),
    },
    Setting {
        key: "llm.timeout_secs",
        env: "LEADFLOW_LLM_TIMEOUT_SECS",
        store: |config, raw| assign(&mut config.llm.timeout_secs, raw),
    },
    Setting {
        key: "agent.max_retries",
        env: "LEADFLOW_AGENT_MAX_RETRIES",
        store: |config, raw| assign(&mut config.agent.max_retries, raw),
    },
    Setting {
        key: "agent.product_search_limit",
        env: "LEADFLOW_AGENT_PRODUCT_SEARCH_LIMIT",
        store: |config, raw| assign(&mut config.agent.product_search_limit, raw),
    },
    Setting {
        key: "agent.product_min_score",
        env: "LEADFLOW_AGENT_PRODUCT_MIN_SCORE",
        store: |config, raw| assign(&mut config.agent.product_min_score, raw),
    },
    Setting {
        key: "agent.partner_radius_km",
        env: "LEADFLOW_AGENT_PARTNER_RADIUS_KM",
        store: |config, raw| assign(&mut config.agent.partner_radius_km, raw),
    },
    Setting {
        key: "agent.partner_limit",
        env: "LEADFLOW_AGENT_PARTNER_LIMIT",
        store: |config, raw| assign(&mut config.agent.partner_limit, raw),
    },
    Setting {
        key: "logging.level",
        env: "LEADFLOW_LOGGING_LEVEL",
        store: |config, raw| assign_text(&mut config.logging.level, raw),
    },
    Setting {
        key: "logging.format",
        env: "LEADFLOW_LOGGING_FORMAT",
        store: |config, raw| assign(&mut config.logging.format, raw),
    },
];

fn assign<T>(slot: &mut T, raw: &str) -> Result<(), String>
where
    T: FromStr,
    T::Err: Display,
{
    *slot = raw.trim().parse().map_err(|error: T::Err| format!("`{raw}`: {error}"))?;
    Ok(())
}

fn assign_text(slot: &mut String, raw: &str) -> Result<(), String> {
    *slot = raw.trim().to_string();
    Ok(())
}

impl Setting {
    fn apply(&self, config: &mut AppConfig, raw: &str, origin: &str) -> Result<(), ConfigError> {
        (self.store)(config, raw).map_err(|reason| ConfigError::InvalidValue {
            key: self.key,
            origin: origin.to_string(),
            reason,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://leadflow.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Scripted,
                api_key: None,
                base_url: None,
                model: "scripted".to_string(),
                timeout_secs: 60,
            },
            agent: AgentConfig {
                max_retries: 1,
                product_search_limit: 10,
                product_min_score: 0.35,
                partner_radius_km: 30,
                partner_limit: 5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "scripted" => Ok(Self::Scripted),
            _ => Err("expected openai|anthropic|ollama|scripted".to_string()),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err("expected compact|pretty|json".to_string()),
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file, then `LEADFLOW_*` env vars, then validation.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = locate_config_file(options.config_path)? {
            let document = read_document(&path)?;
            let origin = format!("file `{}`", path.display());
            for setting in SETTINGS {
                if let Some(raw) = lookup(&document, setting.key) {
                    setting.apply(&mut config, &raw, &origin)?;
                }
            }
        }

        for setting in SETTINGS {
            if let Some(raw) = read_env(setting.env) {
                setting.apply(&mut config, &raw, setting.env)?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_agent(&self.agent)?;
        validate_logging(&self.logging)
    }

    /// Redacted view for `leadflow config`.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "database": {
                "url": self.database.url,
                "max_connections": self.database.max_connections,
                "timeout_secs": self.database.timeout_secs,
            },
            "llm": {
                "provider": self.llm.provider,
                "model": self.llm.model,
                "base_url": self.llm.base_url,
                "api_key": self.llm.api_key.as_ref().map(|_| "<redacted>"),
                "timeout_secs": self.llm.timeout_secs,
            },
            "agent": {
                "max_retries": self.agent.max_retries,
                "product_search_limit": self.agent.product_search_limit,
                "product_min_score": self.agent.product_min_score,
                "partner_radius_km": self.agent.partner_radius_km,
                "partner_limit": self.agent.partner_limit,
            },
            "logging": {
                "level": self.logging.level,
                "format": self.logging.format,
            },
        })
    }
}

/// The config file in effect: the explicit path (which must exist) or the first default
/// location present.
pub fn locate_config_file(explicit: Option<PathBuf>) -> Result<Option<PathBuf>, ConfigError> {
    match explicit {
        Some(path) if path.exists() => Ok(Some(path)),
        Some(path) => Err(ConfigError::MissingConfigFile(path)),
        None => Ok(DEFAULT_LOCATIONS.iter().map(PathBuf::from).find(|path| path.exists())),
    }
}

/// Reads a config file with `${VAR}` references already substituted.
pub fn read_document(path: &Path) -> Result<toml::Value, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    interpolate_env_vars(&raw)?
        .parse::<toml::Value>()
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Scalar at a dotted key, rendered as text. Strings come back without quotes.
pub fn lookup(document: &toml::Value, dotted_key: &str) -> Option<String> {
    let value = dotted_key.split('.').try_fold(document, |current, key| current.get(key))?;
    Some(match value {
        toml::Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    if !(url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:") {
        return Err(invalid(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
        ));
    }
    if database.max_connections == 0 {
        return Err(invalid("database.max_connections must be greater than zero"));
    }
    if !(1..=300).contains(&database.timeout_secs) {
        return Err(invalid("database.timeout_secs must be in range 1..=300"));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if !(1..=600).contains(&llm.timeout_secs) {
        return Err(invalid("llm.timeout_secs must be in range 1..=600"));
    }
    if llm.model.is_empty() {
        return Err(invalid("llm.model must not be empty"));
    }

    let has_api_key = llm.api_key.as_ref().is_some_and(|key| !key.expose_secret().is_empty());
    let has_base_url = llm.base_url.as_ref().is_some_and(|url| !url.is_empty());
    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic if !has_api_key => {
            Err(invalid("llm.api_key is required for openai/anthropic providers"))
        }
        LlmProvider::Ollama if !has_base_url => {
            Err(invalid("llm.base_url is required for ollama provider"))
        }
        _ => Ok(()),
    }
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.max_retries > 1 {
        return Err(invalid(
            "agent.max_retries must be 0 or 1 (one follow-up before falling back)",
        ));
    }
    if !(1..=50).contains(&agent.product_search_limit) {
        return Err(invalid("agent.product_search_limit must be in range 1..=50"));
    }
    if !(0.0..=1.0).contains(&agent.product_min_score) {
        return Err(invalid("agent.product_min_score must be in range 0.0..=1.0"));
    }
    if agent.partner_radius_km == 0 || agent.partner_limit == 0 {
        return Err(invalid("agent.partner_radius_km and agent.partner_limit must be positive"));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(invalid("logging.level must be one of trace|debug|info|warn|error")),
    }
}

use std::env;
use std::path::Path;

use leadflow_core::config::{
    locate_config_file, lookup, read_document, AppConfig, LoadOptions, SETTINGS,
};
use secrecy::ExposeSecret;
use serde_json::{Map, Value as JsonValue};
use toml::Value;

use crate::commands::CommandResult;

pub fn run(options: LoadOptions) -> CommandResult {
    let explicit_path = options.config_path.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let config_file_path = locate_config_file(explicit_path).ok().flatten();
    let config_file_doc = config_file_path.as_deref().and_then(|path| read_document(path).ok());

    let mut effective = config.summary();
    if let Some(api_key) = config.llm.api_key.as_ref() {
        effective["llm"]["api_key"] = JsonValue::String(redact_token(api_key.expose_secret()));
    }

    let mut sources = Map::new();
    for setting in SETTINGS {
        let source = field_source(
            setting.key,
            setting.env,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        sources.insert(setting.key.to_string(), JsonValue::String(source));
    }

    CommandResult::success_with(
        "config",
        "effective config (source precedence: env > file > default)",
        Some(serde_json::json!({ "effective": effective, "sources": sources })),
    )
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_set = env::var(env_key).map(|value| !value.trim().is_empty()).unwrap_or(false);
    if env_set {
        return format!("env ({env_key})");
    }

    if config_file_doc.is_some_and(|doc| lookup(doc, key_path).is_some()) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{field_source, redact_token};

    #[test]
    fn tokens_keep_only_their_prefix() {
        assert_eq!(redact_token("sk-live-abcdef"), "sk-***");
        assert_eq!(redact_token("opaque"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }

    #[test]
    fn file_keys_are_reported_with_their_file() {
        let doc: toml::Value =
            "[agent]\nmax_retries = 0\n".parse().expect("toml document should parse");
        let path = Path::new("leadflow.toml");

        assert_eq!(
            field_source("agent.max_retries", "LEADFLOW_TEST_UNSET", Some(&doc), Some(path)),
            "file (leadflow.toml)"
        );
        assert_eq!(
            field_source("agent.partner_limit", "LEADFLOW_TEST_UNSET", Some(&doc), Some(path)),
            "default"
        );
        assert_eq!(field_source("logging.level", "LEADFLOW_TEST_UNSET", None, None), "default");
    }
}

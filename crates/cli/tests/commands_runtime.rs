use std::env;
use std::sync::{Mutex, OnceLock};

use leadflow_cli::commands::quote::QuoteOptions;
use leadflow_cli::commands::{calc, config, estimate, migrate, quote};
use leadflow_core::config::LoadOptions;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("LEADFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_rejects_non_sqlite_database_url() {
    with_env(&[("LEADFLOW_DATABASE_URL", "postgres://localhost/leadflow")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_reports_env_sources_and_redacts_the_api_key() {
    with_env(
        &[
            ("LEADFLOW_LLM_PROVIDER", "openai"),
            ("LEADFLOW_LLM_API_KEY", "sk-secret-value"),
            ("LEADFLOW_AGENT_MAX_RETRIES", "0"),
        ],
        || {
            let result = config::run(LoadOptions::default());
            assert_eq!(result.exit_code, 0, "expected config inspection success");

            let payload = parse_payload(&result.output);
            let data = &payload["data"];
            assert_eq!(data["effective"]["llm"]["api_key"], "sk-***");
            assert_eq!(data["effective"]["agent"]["max_retries"], 0);
            assert_eq!(data["sources"]["agent.max_retries"], "env (LEADFLOW_AGENT_MAX_RETRIES)");
            assert_eq!(data["sources"]["logging.level"], "default");
            assert!(!result.output.contains("secret-value"));
        },
    );
}

#[test]
fn config_rejects_more_than_one_retry() {
    with_env(&[("LEADFLOW_AGENT_MAX_RETRIES", "3")], || {
        let result = config::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn calc_ceil_divide_counts_whole_units() {
    let result = calc::run("ceil_divide", "4", Some("2.5"));
    assert_eq!(result.exit_code, 0);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["result"], "2");

    let result = calc::run("ceil_divide", "12", Some("5"));
    assert_eq!(parse_payload(&result.output)["data"]["result"], "3");
}

#[test]
fn calc_reports_unknown_operations_and_division_by_zero() {
    let unknown = parse_payload(&calc::run("sqrt", "9", None).output);
    assert_eq!(unknown["status"], "error");
    assert_eq!(unknown["error_class"], "invalid_operation");

    let result = calc::run("divide", "10", Some("0"));
    assert_eq!(result.exit_code, 3);
    assert_eq!(parse_payload(&result.output)["error_class"], "calculation");

    let bad_operand = parse_payload(&calc::run("add", "ten", Some("1")).output);
    assert_eq!(bad_operand["error_class"], "invalid_input");
}

#[test]
fn quote_applies_discount_before_vat_per_rate() {
    let raw = r#"{
        "items": [
            { "description": "Dakgoot", "quantity": "1", "unit_price_cents": 1000, "tax_rate_bps": 2100 },
            { "description": "Voorrijkosten", "quantity": "1", "unit_price_cents": 1000, "tax_rate_bps": 0 }
        ],
        "discount_type": "percentage",
        "discount_value": 1000
    }"#;

    let result = quote::evaluate(raw, QuoteOptions::default());
    assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

    let totals = &parse_payload(&result.output)["data"];
    assert_eq!(totals["subtotal_cents"], 2000);
    assert_eq!(totals["discount_amount_cents"], 200);
    assert_eq!(totals["vat_total_cents"], 189);
    assert_eq!(totals["total_cents"], 1989);
    assert_eq!(totals["vat_breakdown"][0]["amount_cents"], 0);
    assert_eq!(totals["vat_breakdown"][1]["rate_bps"], 2100);
    assert_eq!(totals["vat_breakdown"][1]["amount_cents"], 189);
}

#[test]
fn quote_flags_override_the_document() {
    let raw = r#"[{ "description": "Zink", "quantity": "2", "unit_price_cents": 1210, "tax_rate_bps": 2100 }]"#;
    let options = QuoteOptions { pricing_mode: Some("inclusief".to_string()), ..QuoteOptions::default() };

    let result = quote::evaluate(raw, options);
    assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

    let totals = &parse_payload(&result.output)["data"];
    assert_eq!(totals["pricing_mode"], "inclusive");
    assert_eq!(totals["total_cents"], 2420);
    assert_eq!(totals["vat_total_cents"], 420);
}

#[test]
fn quote_rejects_empty_items_and_unknown_modes() {
    let empty = quote::evaluate("[]", QuoteOptions::default());
    assert_eq!(empty.exit_code, 2);
    assert_eq!(parse_payload(&empty.output)["error_class"], "invalid_input");

    let raw = r#"[{ "description": "Zink", "quantity": "1", "unit_price_cents": 100, "tax_rate_bps": 900 }]"#;
    let options = QuoteOptions { pricing_mode: Some("gross".to_string()), ..QuoteOptions::default() };
    let unknown = quote::evaluate(raw, options);
    assert_eq!(parse_payload(&unknown.output)["error_class"], "invalid_enum");
}

#[test]
fn estimate_returns_an_unrounded_range() {
    let raw = r#"{
        "material_items": [{ "description": "Zinken goot", "unit_price": "12.50", "quantity": "2" }],
        "labor_hours_low": "2",
        "labor_hours_high": "3",
        "hourly_rate_low": "40",
        "hourly_rate_high": "50",
        "extra_costs": "10"
    }"#;

    let result = estimate::evaluate(raw);
    assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

    let range = &parse_payload(&result.output)["data"];
    assert_eq!(range["total_low"], "115");
    assert_eq!(range["total_high"], "185");
}

#[test]
fn estimate_rejects_inverted_labor_ranges() {
    let raw = r#"{
        "labor_hours_low": "5",
        "labor_hours_high": "1",
        "hourly_rate_low": "40",
        "hourly_rate_high": "40"
    }"#;

    let result = estimate::evaluate(raw);
    assert_eq!(result.exit_code, 3);
    assert_eq!(parse_payload(&result.output)["error_class"], "calculation");
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LEADFLOW_DATABASE_URL",
        "LEADFLOW_DATABASE_MAX_CONNECTIONS",
        "LEADFLOW_DATABASE_TIMEOUT_SECS",
        "LEADFLOW_LLM_PROVIDER",
        "LEADFLOW_LLM_API_KEY",
        "LEADFLOW_LLM_BASE_URL",
        "LEADFLOW_LLM_MODEL",
        "LEADFLOW_LLM_TIMEOUT_SECS",
        "LEADFLOW_AGENT_MAX_RETRIES",
        "LEADFLOW_AGENT_PRODUCT_SEARCH_LIMIT",
        "LEADFLOW_AGENT_PRODUCT_MIN_SCORE",
        "LEADFLOW_AGENT_PARTNER_RADIUS_KM",
        "LEADFLOW_AGENT_PARTNER_LIMIT",
        "LEADFLOW_LOGGING_LEVEL",
        "LEADFLOW_LOGGING_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

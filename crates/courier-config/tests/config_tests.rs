// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Courier configuration system.

use courier_config::diagnostic::ConfigError;
use courier_config::model::{CourierConfig, SignatureScheme};
use courier_config::{load_and_validate_str, load_config, load_config_from_str};
use figment::Jail;
use serial_test::serial;

#[test]
fn valid_toml_deserializes_into_courier_config() {
    let toml = r#"
[server]
host = "127.0.0.1"
port = 9090
log_level = "debug"

[storage]
database_path = "/tmp/courier-test.db"
wal_mode = false

[cache]
ttl_secs = 300

[provider]
account_sid = "AC123"
auth_token = "secret-token"
whatsapp_from = "whatsapp:+15550001111"

[webhook]
secret = "hook-secret"
signature_scheme = "hmac-sha256"
public_base_url = "https://hooks.example.com"

[downstream]
orchestrator_url = "http://orchestrator:8081"
timeout_secs = 5

[dispatch]
max_concurrency = 4
max_attempts = 1

[api]
bearer_token = "api-token"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/courier-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.cache.ttl_secs, 300);
    assert_eq!(config.cache.max_entries, 10_000);
    assert_eq!(config.provider.account_sid.as_deref(), Some("AC123"));
    assert_eq!(config.provider.whatsapp_from, "whatsapp:+15550001111");
    assert_eq!(config.webhook.effective_secret(), Some("hook-secret"));
    assert_eq!(config.webhook.signature_scheme, SignatureScheme::HmacSha256);
    assert_eq!(config.downstream.orchestrator_url, "http://orchestrator:8081");
    assert_eq!(config.downstream.ai_processing_url, "http://localhost:8082");
    assert_eq!(config.dispatch.max_concurrency, 4);
    assert_eq!(config.dispatch.max_attempts, 1);
    assert_eq!(config.dispatch.queue_capacity, 1024);
    assert_eq!(config.api.bearer_token.as_deref(), Some("api-token"));
}

#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert!(config.storage.wal_mode);
    assert_eq!(config.provider.api_base_url, "https://api.twilio.com");
    assert!(config.provider.auth_token.is_none());
    assert!(config.webhook.effective_secret().is_none());
    assert_eq!(config.dispatch.initial_backoff_ms, 500);
    assert_eq!(config.dispatch.max_backoff_ms, 10_000);
    assert_eq!(config.dispatch.drain_timeout_secs, 10);
    assert!(config.api.bearer_token.is_none());
}

#[test]
fn unknown_field_in_provider_produces_error() {
    let toml = r#"
[provider]
auth_tken = "abc"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("auth_tken"),
        "error should mention unknown field, got: {err_str}"
    );
}

#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "error should mention unknown field, got: {err_str}"
    );
}

#[test]
fn unknown_key_diagnostic_carries_suggestion_and_valid_keys() {
    let toml = r#"
[dispatch]
max_atempts = 2
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "max_atempts"
                && suggestion.as_deref() == Some("max_attempts")
                && valid_keys.contains("queue_capacity")
        })
    });
    assert!(found, "expected UnknownKey for max_atempts, got: {errors:?}");
}

#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[server]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port"))),
        "got: {errors:?}"
    );
}

#[test]
fn unknown_signature_scheme_is_rejected() {
    let toml = r#"
[webhook]
signature_scheme = "md5"
"#;

    assert!(load_config_from_str(toml).is_err());
}

#[test]
fn validation_runs_after_successful_parse() {
    let toml = r#"
[dispatch]
initial_backoff_ms = 5000
max_backoff_ms = 100
"#;

    let errors = load_and_validate_str(toml).expect_err("backoff bounds should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("initial_backoff_ms"))
    }));
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "prot".to_string(),
        suggestion: Some("port".to_string()),
        valid_keys: "host, port, log_level".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `port`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("prot"));
}

#[test]
#[serial]
fn env_vars_override_file_values() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "courier.toml",
            r#"
[provider]
auth_token = "from-file"
whatsapp_from = "whatsapp:+15550001111"
"#,
        )?;
        jail.set_env("COURIER_PROVIDER_AUTH_TOKEN", "from-env");
        jail.set_env("COURIER_DISPATCH_MAX_ATTEMPTS", "5");

        let config: CourierConfig = load_config()?;
        assert_eq!(config.provider.auth_token.as_deref(), Some("from-env"));
        assert_eq!(config.provider.whatsapp_from, "whatsapp:+15550001111");
        assert_eq!(config.dispatch.max_attempts, 5);
        Ok(())
    });
}

#[test]
#[serial]
fn load_and_validate_defaults() {
    Jail::expect_with(|_jail| {
        let config = courier_config::load_and_validate().expect("defaults should validate");
        assert_eq!(config.server.port, 8080);
        Ok(())
    });
}

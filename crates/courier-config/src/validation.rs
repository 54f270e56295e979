// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.server.host.trim().is_empty() {
        fail("server.host must not be empty".to_string());
    }
    if config.server.port == 0 {
        fail("server.port must not be 0".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.cache.ttl_secs == 0 {
        fail("cache.ttl_secs must be at least 1".to_string());
    }
    if config.cache.cleanup_interval_secs == 0 {
        fail("cache.cleanup_interval_secs must be at least 1".to_string());
    }

    if config.provider.whatsapp_from.trim().is_empty() {
        fail("provider.whatsapp_from must not be empty".to_string());
    }

    for (key, url) in [
        ("provider.api_base_url", &config.provider.api_base_url),
        ("downstream.orchestrator_url", &config.downstream.orchestrator_url),
        ("downstream.ai_processing_url", &config.downstream.ai_processing_url),
        ("media.public_base_url", &config.media.public_base_url),
    ] {
        if !is_http_url(url) {
            fail(format!("{key} `{url}` must start with http:// or https://"));
        }
    }
    if let Some(url) = &config.webhook.public_base_url
        && !is_http_url(url)
    {
        fail(format!(
            "webhook.public_base_url `{url}` must start with http:// or https://"
        ));
    }

    let dispatch = &config.dispatch;
    if dispatch.max_concurrency < 1 {
        fail("dispatch.max_concurrency must be at least 1".to_string());
    }
    if dispatch.queue_capacity < 1 {
        fail("dispatch.queue_capacity must be at least 1".to_string());
    }
    if dispatch.max_attempts < 1 {
        fail("dispatch.max_attempts must be at least 1".to_string());
    }
    if dispatch.initial_backoff_ms > dispatch.max_backoff_ms {
        fail(format!(
            "dispatch.initial_backoff_ms ({}) must not exceed dispatch.max_backoff_ms ({})",
            dispatch.initial_backoff_ms, dispatch.max_backoff_ms
        ));
    }

    if config.media.root_dir.trim().is_empty() {
        fail("media.root_dir must not be empty".to_string());
    }
    if config.media.max_upload_bytes == 0 {
        fail("media.max_upload_bytes must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CourierConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CourierConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn backoff_bounds_are_checked() {
        let mut config = CourierConfig::default();
        config.dispatch.initial_backoff_ms = 20_000;
        config.dispatch.max_backoff_ms = 1_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "initial_backoff_ms"));
    }

    #[test]
    fn all_problems_are_collected() {
        let mut config = CourierConfig::default();
        config.server.port = 0;
        config.dispatch.max_attempts = 0;
        config.downstream.orchestrator_url = "localhost:8081".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "server.port"));
        assert!(has_error(&errors, "max_attempts"));
        assert!(has_error(&errors, "orchestrator_url"));
    }

    #[test]
    fn webhook_public_url_is_optional_but_checked() {
        let mut config = CourierConfig::default();
        config.webhook.public_base_url = Some("https://hooks.example.com".into());
        assert!(validate_config(&config).is_ok());
        config.webhook.public_base_url = Some("hooks.example.com".into());
        assert!(validate_config(&config).is_err());
    }
}

// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier check-config` command implementation.
//!
//! Prints the effective configuration after validation. Secrets are never
//! printed, only whether they are set.

use std::io::IsTerminal;

use courier_config::CourierConfig;

/// One line of the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub key: &'static str,
    pub value: String,
    /// Set when the value deserves attention in production.
    pub warning: bool,
}

impl SummaryLine {
    fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
            warning: false,
        }
    }

    fn secret(key: &'static str, value: Option<&str>) -> Self {
        let set = value.is_some_and(|v| !v.trim().is_empty());
        Self {
            key,
            value: if set { "set".into() } else { "not set".into() },
            warning: !set,
        }
    }
}

/// The effective settings, secrets redacted.
pub fn summary(config: &CourierConfig) -> Vec<SummaryLine> {
    let dispatch = &config.dispatch;
    vec![
        SummaryLine::new(
            "server",
            format!("{}:{}", config.server.host, config.server.port),
        ),
        SummaryLine::new("log_level", config.server.log_level.clone()),
        SummaryLine::new("database", config.storage.database_path.clone()),
        SummaryLine::new(
            "cache",
            format!(
                "ttl {}s, max {} entries",
                config.cache.ttl_secs, config.cache.max_entries
            ),
        ),
        SummaryLine::new("whatsapp_from", config.provider.whatsapp_from.clone()),
        SummaryLine::new("provider_api", config.provider.api_base_url.clone()),
        SummaryLine::secret("provider.account_sid", config.provider.account_sid.as_deref()),
        SummaryLine::secret("provider.auth_token", config.provider.auth_token.as_deref()),
        SummaryLine::secret("webhook.secret", config.webhook.effective_secret()),
        SummaryLine::new(
            "signature_scheme",
            format!("{:?}", config.webhook.signature_scheme).to_lowercase(),
        ),
        SummaryLine::new("orchestrator", config.downstream.orchestrator_url.clone()),
        SummaryLine::new("ai_processing", config.downstream.ai_processing_url.clone()),
        SummaryLine::new(
            "dispatch",
            format!(
                "{} workers, queue {}, {} attempts",
                dispatch.max_concurrency, dispatch.queue_capacity, dispatch.max_attempts
            ),
        ),
        SummaryLine::new("media_root", config.media.root_dir.clone()),
        SummaryLine::secret("api.bearer_token", config.api.bearer_token.as_deref()),
    ]
}

/// Run the `courier check-config` command.
pub fn run_check_config(config: &CourierConfig, plain: bool) {
    let use_color = !plain && std::io::stdout().is_terminal();

    println!();
    println!("  courier check-config");
    println!("  {}", "-".repeat(50));

    let mut warnings = 0;
    for line in summary(config) {
        let value = if line.warning {
            warnings += 1;
            if use_color {
                use colored::Colorize;
                line.value.yellow().to_string()
            } else {
                format!("{} (!)", line.value)
            }
        } else {
            line.value
        };
        println!("  {:<22} {value}", line.key);
    }

    println!();
    let verdict = format!("  configuration is valid, {warnings} warning(s)");
    if use_color {
        use colored::Colorize;
        println!("{}", verdict.green());
    } else {
        println!("{verdict}");
    }
}

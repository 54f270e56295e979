// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a
//! no-op, so library crates record unconditionally.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Courier metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "courier_webhooks_total",
        "Webhook deliveries by payload kind and outcome"
    );
    describe_counter!(
        "courier_status_updates_total",
        "Status updates by reconciliation outcome"
    );
    describe_counter!(
        "courier_cache_lookups_total",
        "Message cache lookups by result"
    );
    describe_counter!("courier_sends_total", "Outbound sends by outcome");
    describe_counter!(
        "courier_dispatch_tasks_total",
        "Fan-out tasks by task and outcome"
    );
    describe_gauge!(
        "courier_dispatch_in_flight",
        "Fan-out tasks accepted and not yet finished"
    );
    describe_histogram!(
        "courier_dispatch_latency_seconds",
        "Fan-out task duration in seconds, retries included"
    );
}

/// Record one webhook delivery. `kind` is `message`, `status` or `unknown`.
pub fn record_webhook(kind: &'static str, outcome: &'static str) {
    metrics::counter!("courier_webhooks_total", "kind" => kind, "outcome" => outcome).increment(1);
}

/// Record a status update outcome (`applied`, `ignored_stale`, `unknown_message`, ...).
pub fn record_status_update(outcome: &'static str) {
    metrics::counter!("courier_status_updates_total", "outcome" => outcome).increment(1);
}

/// Record a cache lookup: `hit`, `miss` or `error`.
pub fn record_cache_lookup(result: &'static str) {
    metrics::counter!("courier_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_send(outcome: &'static str) {
    metrics::counter!("courier_sends_total", "outcome" => outcome).increment(1);
}

/// Record a finished or rejected fan-out task.
pub fn record_dispatch_task(task: &'static str, outcome: &'static str) {
    metrics::counter!("courier_dispatch_tasks_total", "task" => task, "outcome" => outcome)
        .increment(1);
}

pub fn set_dispatch_in_flight(count: f64) {
    metrics::gauge!("courier_dispatch_in_flight").set(count);
}

pub fn record_dispatch_latency(task: &'static str, seconds: f64) {
    metrics::histogram!("courier_dispatch_latency_seconds", "task" => task).record(seconds);
}

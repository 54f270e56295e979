// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out of ingested messages to downstream collaborators.
//!
//! [`Dispatcher`] runs submitted tasks off the request path with bounded
//! concurrency, a bounded backlog and retry with capped exponential backoff.
//! [`FanOut`] turns one inbound message into its relay and media tasks.

pub mod dispatcher;
pub mod fanout;
pub mod http;
pub mod reply;
pub mod retry;

pub use dispatcher::{Dispatcher, SubmitError};
pub use fanout::FanOut;
pub use http::{HttpMediaAnalyzer, HttpRelay};
pub use reply::LoggingReplyHandler;
pub use retry::RetryPolicy;

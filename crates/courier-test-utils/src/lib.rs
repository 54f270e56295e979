// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockMessenger`] - provider that accepts sends and reports scripted statuses
//! - [`MockRelay`] / [`MockAnalyzer`] - recording downstream collaborators
//! - [`MemoryBlobStore`] - in-memory media store
//! - [`TestHarness`] - the whole service behind its HTTP router

pub mod harness;
pub mod mock_blob;
pub mod mock_downstream;
pub mod mock_messenger;

pub use harness::{TEST_HOST, TestHarness};
pub use mock_blob::MemoryBlobStore;
pub use mock_downstream::{MockAnalyzer, MockRelay};
pub use mock_messenger::MockMessenger;

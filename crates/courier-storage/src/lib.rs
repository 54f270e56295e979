// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for Courier.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, typed queries for messages, users and
//! chat sessions, and a filesystem blob store for uploaded media.

pub mod adapter;
pub mod blob;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use blob::FsBlobStore;
pub use database::Database;

// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-through message cache for Courier.
//!
//! The cache is an expendable copy of the durable store. Discarding it at any
//! time is safe; it is never consulted for writes.

pub mod memory;

pub use memory::MemoryCache;

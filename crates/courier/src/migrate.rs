// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier migrate` command implementation.

use courier_config::CourierConfig;
use courier_core::CourierError;
use courier_storage::Database;

/// Open the configured database, which applies any pending migrations, and
/// close it again.
pub async fn run_migrate(config: &CourierConfig) -> Result<(), CourierError> {
    let path = &config.storage.database_path;
    let db = Database::open_with_wal(path, config.storage.wal_mode).await?;
    db.close().await?;
    println!("courier: database at {path} is up to date");
    Ok(())
}

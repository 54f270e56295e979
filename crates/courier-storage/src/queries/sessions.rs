// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session reads. Sessions are written by the orchestrator; the insert
//! here exists for tooling and tests.

use courier_core::model::format_timestamp;
use courier_core::{ChatSession, CourierError};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::queries::{optional_timestamp_column, parse_column, timestamp_column};

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatSession> {
    let context: Option<String> = row.get(3)?;
    let context = context
        .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(ChatSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        status: parse_column(row, 2)?,
        context,
        started_at: timestamp_column(row, 4)?,
        ended_at: optional_timestamp_column(row, 5)?,
    })
}

/// Insert a chat session.
pub async fn insert_session(db: &Database, session: &ChatSession) -> Result<(), CourierError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_sessions (id, user_id, status, context, started_at, ended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.id,
                    session.user_id,
                    session.status.to_string(),
                    session.context.as_ref().map(|c| c.to_string()),
                    format_timestamp(&session.started_at),
                    session.ended_at.as_ref().map(format_timestamp),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session by id.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<ChatSession>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, user_id, status, context, started_at, ended_at
                 FROM chat_sessions WHERE id = ?1",
                params![id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

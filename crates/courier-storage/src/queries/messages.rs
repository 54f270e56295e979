// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence and the atomic status-reconciliation update.

use courier_core::model::{format_timestamp, now_millis};
use courier_core::status::{IgnoreReason, MessageStatus, Transition, reconcile};
use courier_core::{CourierError, Message, StatusOutcome, StatusUpdate, UpsertMode, UpsertOutcome};
use rusqlite::{OptionalExtension, Transaction, params};

use crate::database::Database;
use crate::queries::{parse_column, timestamp_column};

const MESSAGE_COLUMNS: &str = "id, provider_id, from_number, to_number, direction, message_type,
     status, content, media_url, media_type, timestamp, created_at, updated_at,
     user_id, session_id, error_code, error_message";

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        from: row.get(2)?,
        to: row.get(3)?,
        direction: parse_column(row, 4)?,
        message_type: parse_column(row, 5)?,
        status: parse_column(row, 6)?,
        content: row.get(7)?,
        media_url: row.get(8)?,
        media_type: row.get(9)?,
        timestamp: timestamp_column(row, 10)?,
        created_at: timestamp_column(row, 11)?,
        updated_at: timestamp_column(row, 12)?,
        user_id: row.get(13)?,
        session_id: row.get(14)?,
        error_code: row.get(15)?,
        error_message: row.get(16)?,
    })
}

fn select_by_provider_id(
    tx: &Transaction<'_>,
    provider_id: &str,
) -> rusqlite::Result<Option<Message>> {
    tx.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE provider_id = ?1"),
        params![provider_id],
        message_from_row,
    )
    .optional()
}

fn insert_row(tx: &Transaction<'_>, msg: &Message) -> rusqlite::Result<()> {
    tx.execute(
        &format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            msg.id,
            msg.provider_id,
            msg.from,
            msg.to,
            msg.direction.to_string(),
            msg.message_type.to_string(),
            msg.status.to_string(),
            msg.content,
            msg.media_url,
            msg.media_type,
            format_timestamp(&msg.timestamp),
            format_timestamp(&msg.created_at),
            format_timestamp(&msg.updated_at),
            msg.user_id,
            msg.session_id,
            msg.error_code,
            msg.error_message,
        ],
    )?;
    Ok(())
}

/// Combine an existing row with a send acknowledgment for the same provider id.
///
/// The furthest status wins. Fields already recorded are kept; blanks are
/// filled from the acknowledgment.
fn merge_acknowledgment(existing: &Message, ack: &Message) -> Message {
    let status = match reconcile(existing.status, ack.status, ack.error_code.as_deref()) {
        Transition::Apply(next) => next,
        Transition::Ignore(_) => existing.status,
    };
    let content = if existing.content.is_empty() {
        ack.content.clone()
    } else {
        existing.content.clone()
    };

    Message {
        status,
        content,
        media_url: existing.media_url.clone().or_else(|| ack.media_url.clone()),
        media_type: existing.media_type.clone().or_else(|| ack.media_type.clone()),
        user_id: existing.user_id.clone().or_else(|| ack.user_id.clone()),
        session_id: existing.session_id.clone().or_else(|| ack.session_id.clone()),
        error_code: ack.error_code.clone().or_else(|| existing.error_code.clone()),
        error_message: ack
            .error_message
            .clone()
            .or_else(|| existing.error_message.clone()),
        updated_at: now_millis(),
        ..existing.clone()
    }
}

/// Insert a message, or resolve the conflict on provider id according to `mode`.
pub async fn upsert_message(
    db: &Database,
    msg: &Message,
    mode: UpsertMode,
) -> Result<UpsertOutcome, CourierError> {
    msg.validate()?;
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let outcome = match select_by_provider_id(&tx, &msg.provider_id)? {
                None => {
                    insert_row(&tx, &msg)?;
                    UpsertOutcome::Inserted(msg)
                }
                Some(existing) if mode == UpsertMode::Create => UpsertOutcome::Existing(existing),
                Some(existing) => {
                    let merged = merge_acknowledgment(&existing, &msg);
                    tx.execute(
                        "UPDATE messages SET status = ?1, content = ?2, media_url = ?3,
                         media_type = ?4, user_id = ?5, session_id = ?6, error_code = ?7,
                         error_message = ?8, updated_at = ?9
                         WHERE id = ?10",
                        params![
                            merged.status.to_string(),
                            merged.content,
                            merged.media_url,
                            merged.media_type,
                            merged.user_id,
                            merged.session_id,
                            merged.error_code,
                            merged.error_message,
                            format_timestamp(&merged.updated_at),
                            merged.id,
                        ],
                    )?;
                    UpsertOutcome::Merged(merged)
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Reconcile a status update against the stored status and persist the result.
///
/// The read, the decision and the write share one transaction on the single
/// writer connection, and the write is additionally guarded by a
/// compare-and-set on the status that was read. The provider's event time
/// becomes the row's `updated_at`.
pub async fn apply_status(
    db: &Database,
    update: &StatusUpdate,
) -> Result<StatusOutcome, CourierError> {
    let update = update.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current = tx
                .query_row(
                    "SELECT id, status FROM messages WHERE provider_id = ?1",
                    params![update.provider_id],
                    |row| Ok((row.get::<_, String>(0)?, parse_column::<MessageStatus>(row, 1)?)),
                )
                .optional()?;

            let Some((id, current)) = current else {
                tx.commit()?;
                return Ok(StatusOutcome::UnknownMessage);
            };

            let outcome = match reconcile(current, update.status, update.error_code.as_deref()) {
                Transition::Ignore(reason) => StatusOutcome::Ignored {
                    id,
                    current,
                    reason,
                },
                Transition::Apply(next) => {
                    let changed = tx.execute(
                        "UPDATE messages SET status = ?1,
                         error_code = COALESCE(?2, error_code),
                         error_message = COALESCE(?3, error_message),
                         updated_at = ?4
                         WHERE id = ?5 AND status = ?6",
                        params![
                            next.to_string(),
                            update.error_code,
                            update.error_message,
                            format_timestamp(&update.timestamp),
                            id,
                            current.to_string(),
                        ],
                    )?;
                    if changed == 1 {
                        StatusOutcome::Applied {
                            id,
                            previous: current,
                            current: next,
                        }
                    } else {
                        StatusOutcome::Ignored {
                            id,
                            current,
                            reason: IgnoreReason::Stale,
                        }
                    }
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a message by internal id.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a message by provider id.
pub async fn get_message_by_provider_id(
    db: &Database,
    provider_id: &str,
) -> Result<Option<Message>, CourierError> {
    let provider_id = provider_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE provider_id = ?1"),
                params![provider_id],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages sent to or from `address`, newest event first.
pub async fn list_by_participant(
    db: &Database,
    address: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<Message>, CourierError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE from_number = ?1 OR to_number = ?1
                 ORDER BY timestamp DESC, created_at DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt.query_map(params![address, limit, offset], message_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent messages, newest event first.
pub async fn list_recent(db: &Database, limit: u32) -> Result<Vec<Message>, CourierError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 ORDER BY timestamp DESC, created_at DESC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], message_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use courier_core::{Direction, MessageType};

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn inbound(provider_id: &str) -> Message {
        let mut msg = Message::new(
            Direction::Inbound,
            provider_id,
            "whatsapp:+551199990000",
            "whatsapp:+14155238886",
        );
        msg.status = MessageStatus::Delivered;
        msg.content = "oi".into();
        msg
    }

    fn outbound(provider_id: &str, status: MessageStatus) -> Message {
        let mut msg = Message::new(
            Direction::Outbound,
            provider_id,
            "whatsapp:+14155238886",
            "whatsapp:+551199990000",
        );
        msg.status = status;
        msg
    }

    fn update(provider_id: &str, raw: &str, code: Option<&str>) -> StatusUpdate {
        StatusUpdate::from_provider(provider_id, raw, code.map(String::from), None, Utc::now())
    }

    #[tokio::test]
    async fn insert_then_read_back() {
        let db = setup().await;
        let mut msg = inbound("SM1");
        msg.message_type = MessageType::Image;
        msg.media_url = Some("https://media/1".into());
        msg.media_type = Some("image/jpeg".into());

        let outcome = upsert_message(&db, &msg, UpsertMode::Create).await.unwrap();
        assert!(outcome.is_new());

        let stored = get_message(&db, &msg.id).await.unwrap().unwrap();
        assert_eq!(stored, msg);
        let by_sid = get_message_by_provider_id(&db, "SM1").await.unwrap().unwrap();
        assert_eq!(by_sid.id, msg.id);
    }

    #[tokio::test]
    async fn duplicate_create_returns_existing() {
        let db = setup().await;
        let first = inbound("SM1");
        upsert_message(&db, &first, UpsertMode::Create).await.unwrap();

        let mut replay = inbound("SM1");
        replay.content = "different".into();
        let outcome = upsert_message(&db, &replay, UpsertMode::Create).await.unwrap();
        match outcome {
            UpsertOutcome::Existing(existing) => {
                assert_eq!(existing.id, first.id);
                assert_eq!(existing.content, "oi");
            }
            other => panic!("expected Existing, got {other:?}"),
        }
        assert_eq!(list_recent(&db, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn acknowledge_merges_keeping_furthest_status() {
        let db = setup().await;
        // A delivery callback raced ahead of the send acknowledgment.
        let early = outbound("SM9", MessageStatus::Delivered);
        upsert_message(&db, &early, UpsertMode::Acknowledge).await.unwrap();

        let mut ack = outbound("SM9", MessageStatus::Sent);
        ack.content = "hello".into();
        ack.session_id = Some("sess-1".into());
        let outcome = upsert_message(&db, &ack, UpsertMode::Acknowledge).await.unwrap();
        let merged = match outcome {
            UpsertOutcome::Merged(m) => m,
            other => panic!("expected Merged, got {other:?}"),
        };
        assert_eq!(merged.id, early.id);
        assert_eq!(merged.status, MessageStatus::Delivered);
        assert_eq!(merged.content, "hello");
        assert_eq!(merged.session_id.as_deref(), Some("sess-1"));

        let stored = get_message(&db, &early.id).await.unwrap().unwrap();
        assert_eq!(stored, merged);
    }

    #[tokio::test]
    async fn upsert_rejects_invalid_record() {
        let db = setup().await;
        let msg = inbound("");
        assert!(matches!(
            upsert_message(&db, &msg, UpsertMode::Create).await,
            Err(CourierError::MalformedPayload(_))
        ));
    }

    #[tokio::test]
    async fn delivered_then_sent_stays_delivered() {
        let db = setup().await;
        let msg = outbound("SM1", MessageStatus::Sent);
        upsert_message(&db, &msg, UpsertMode::Create).await.unwrap();

        let applied = apply_status(&db, &update("SM1", "delivered", None)).await.unwrap();
        assert_eq!(
            applied,
            StatusOutcome::Applied {
                id: msg.id.clone(),
                previous: MessageStatus::Sent,
                current: MessageStatus::Delivered,
            }
        );

        let stale = apply_status(&db, &update("SM1", "sent", None)).await.unwrap();
        assert_eq!(stale.label(), "ignored_stale");

        let stored = get_message(&db, &msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Delivered);
    }

    #[tokio::test]
    async fn duplicate_status_is_ignored() {
        let db = setup().await;
        let msg = outbound("SM1", MessageStatus::Sent);
        upsert_message(&db, &msg, UpsertMode::Create).await.unwrap();

        apply_status(&db, &update("SM1", "delivered", None)).await.unwrap();
        let again = apply_status(&db, &update("SM1", "delivered", None)).await.unwrap();
        assert_eq!(again.label(), "ignored_duplicate");
    }

    #[tokio::test]
    async fn error_code_marks_failed_and_records_error() {
        let db = setup().await;
        let msg = outbound("SM1", MessageStatus::Sent);
        upsert_message(&db, &msg, UpsertMode::Create).await.unwrap();

        let event_time = courier_core::model::parse_timestamp("2024-05-01T10:00:00.250Z").unwrap();
        let mut failing = update("SM1", "undelivered", Some("63016"));
        failing.error_message = Some("outside session window".into());
        failing.timestamp = event_time;
        let outcome = apply_status(&db, &failing).await.unwrap();
        assert_eq!(outcome.label(), "applied");

        let stored = get_message(&db, &msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Failed);
        assert_eq!(stored.error_code.as_deref(), Some("63016"));
        assert_eq!(stored.error_message.as_deref(), Some("outside session window"));
        assert_eq!(stored.updated_at, event_time);

        let late = apply_status(&db, &update("SM1", "read", None)).await.unwrap();
        assert_eq!(late.label(), "ignored_terminal");
    }

    #[tokio::test]
    async fn unknown_provider_id_changes_nothing() {
        let db = setup().await;
        let outcome = apply_status(&db, &update("SM404", "delivered", None))
            .await
            .unwrap();
        assert_eq!(outcome, StatusOutcome::UnknownMessage);
        assert!(list_recent(&db, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_updates_converge_by_rank() {
        let db = setup().await;
        let msg = outbound("SM1", MessageStatus::Sent);
        upsert_message(&db, &msg, UpsertMode::Create).await.unwrap();

        let mut handles = Vec::new();
        for raw in ["sent", "delivered", "sent", "delivered", "sent"] {
            let db = db.clone();
            let u = update("SM1", raw, None);
            handles.push(tokio::spawn(async move { apply_status(&db, &u).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = get_message(&db, &msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Delivered);
    }

    #[tokio::test]
    async fn listing_orders_by_event_time_and_filters_participant() {
        let db = setup().await;
        let base = Utc::now();
        for (i, sid) in ["SM1", "SM2", "SM3"].iter().enumerate() {
            let mut msg = inbound(sid);
            msg.timestamp = base + Duration::seconds(i as i64);
            upsert_message(&db, &msg, UpsertMode::Create).await.unwrap();
        }
        let mut other = inbound("SM4");
        other.from = "whatsapp:+10000000000".into();
        upsert_message(&db, &other, UpsertMode::Create).await.unwrap();

        let listed = list_by_participant(&db, "whatsapp:+551199990000", 10, 0)
            .await
            .unwrap();
        let sids: Vec<_> = listed.iter().map(|m| m.provider_id.as_str()).collect();
        assert_eq!(sids, vec!["SM3", "SM2", "SM1"]);

        let page = list_by_participant(&db, "whatsapp:+551199990000", 1, 1)
            .await
            .unwrap();
        assert_eq!(page[0].provider_id, "SM2");

        // Outbound messages match on the recipient.
        let to_business = list_by_participant(&db, "whatsapp:+14155238886", 10, 0)
            .await
            .unwrap();
        assert_eq!(to_business.len(), 4);

        assert_eq!(list_recent(&db, 2).await.unwrap().len(), 2);
    }
}

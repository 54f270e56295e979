// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User registry operations.

use courier_core::model::{format_timestamp, now_millis};
use courier_core::{CourierError, User, UserProfile};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::queries::timestamp_column;

const USER_COLUMNS: &str =
    "id, phone_number, provider_user_id, profile_name, is_active, created_at, updated_at";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        provider_user_id: row.get(2)?,
        profile_name: row.get(3)?,
        is_active: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

/// Create the user on first sight; refresh profile fields that changed.
///
/// Absent profile fields never erase stored ones.
pub async fn upsert_user(db: &Database, profile: &UserProfile) -> Result<User, CourierError> {
    if profile.phone_number.trim().is_empty() {
        return Err(CourierError::MalformedPayload(
            "user phone number is empty".into(),
        ));
    }
    let profile = profile.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = tx
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE phone_number = ?1"),
                    params![profile.phone_number],
                    user_from_row,
                )
                .optional()?;

            let now = now_millis();
            let user = match existing {
                None => {
                    let user = User {
                        id: uuid::Uuid::new_v4().to_string(),
                        phone_number: profile.phone_number.clone(),
                        provider_user_id: profile.provider_user_id.clone(),
                        profile_name: profile.profile_name.clone(),
                        is_active: true,
                        created_at: now,
                        updated_at: now,
                    };
                    tx.execute(
                        &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                        params![
                            user.id,
                            user.phone_number,
                            user.provider_user_id,
                            user.profile_name,
                            user.is_active,
                            format_timestamp(&user.created_at),
                            format_timestamp(&user.updated_at),
                        ],
                    )?;
                    user
                }
                Some(mut user) => {
                    let provider_user_id = profile
                        .provider_user_id
                        .clone()
                        .or_else(|| user.provider_user_id.clone());
                    let profile_name = profile
                        .profile_name
                        .clone()
                        .or_else(|| user.profile_name.clone());
                    if provider_user_id != user.provider_user_id
                        || profile_name != user.profile_name
                    {
                        user.provider_user_id = provider_user_id;
                        user.profile_name = profile_name;
                        user.updated_at = now;
                        tx.execute(
                            "UPDATE users SET provider_user_id = ?1, profile_name = ?2, updated_at = ?3
                             WHERE id = ?4",
                            params![
                                user.provider_user_id,
                                user.profile_name,
                                format_timestamp(&user.updated_at),
                                user.id,
                            ],
                        )?;
                    }
                    user
                }
            };
            tx.commit()?;
            Ok(user)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user by phone number.
pub async fn get_user_by_phone(
    db: &Database,
    phone_number: &str,
) -> Result<Option<User>, CourierError> {
    let phone_number = phone_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE phone_number = ?1"),
                params![phone_number],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

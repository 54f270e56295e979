// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the `/api/v1` REST API.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_core::{ChatSession, Message, StoredBlob, whatsapp_address};
use courier_engine::{SendRequest, SendResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Default page size for `GET /api/v1/messages`.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Multipart field carrying an upload.
pub const UPLOAD_FIELD: &str = "media";

/// POST /api/v1/messages/send
pub async fn send_message(
    State(state): State<GatewayState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::malformed(e.body_text()))?;
    let response = state.sender.send(&request).await?;
    Ok(Json(response))
}

/// GET /api/v1/messages/{id}
pub async fn get_message(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    state
        .ingestor
        .repository()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("message"))
}

/// Query of `GET /api/v1/messages`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub phone: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub limit: u32,
    pub offset: u32,
}

/// GET /api/v1/messages
pub async fn list_messages(
    State(state): State<GatewayState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<MessageList>, ApiError> {
    let participant = query
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(whatsapp_address);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, courier_engine::repository::MAX_PAGE_SIZE);
    let offset = if participant.is_some() {
        query.offset.unwrap_or(0)
    } else {
        0
    };

    let messages = state
        .ingestor
        .repository()
        .list(participant.as_deref(), limit, offset)
        .await?;
    Ok(Json(MessageList {
        messages,
        limit,
        offset,
    }))
}

/// Response of a status refresh.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// `applied`, `ignored_*` or `unknown_message`.
    pub outcome: &'static str,
    pub message: Option<Message>,
}

/// POST /api/v1/messages/{id}/refresh
pub async fn refresh_message(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let outcome = state
        .sender
        .refresh_status(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("message"))?;
    let message = state.ingestor.repository().get(&id).await?;
    Ok(Json(RefreshResponse {
        outcome: outcome.label(),
        message,
    }))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ChatSession>, ApiError> {
    state
        .ingestor
        .repository()
        .get_session(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("session"))
}

/// Response of a media upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub media_url: String,
    pub filename: String,
    pub size: u64,
}

/// POST /api/v1/media/upload
pub async fn upload_media(
    State(state): State<GatewayState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::malformed(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::malformed(e.body_text()))?;
        if data.is_empty() {
            return Err(ApiError::malformed("uploaded file is empty"));
        }

        let StoredBlob { url, key, size } = state
            .blobs
            .put(&filename, &content_type, data.to_vec())
            .await?;
        info!(key = %key, size, content_type = %content_type, "media uploaded");
        return Ok(Json(UploadResponse {
            media_url: url,
            filename,
            size,
        }));
    }
    Err(ApiError::malformed(format!(
        "no `{UPLOAD_FIELD}` file in upload"
    )))
}

#[derive(Debug, Deserialize)]
pub struct DeleteMediaQuery {
    pub url: String,
}

/// DELETE /api/v1/media?url=
pub async fn delete_media(
    State(state): State<GatewayState>,
    Query(query): Query<DeleteMediaQuery>,
) -> Result<Response, ApiError> {
    state.blobs.delete(&query.url).await?;
    debug!(url = %query.url, "media deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_fields_are_optional() {
        let uri: axum::http::Uri = "/api/v1/messages?phone=%2B1555&limit=10".parse().unwrap();
        let Query(query) = Query::<ListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.phone.as_deref(), Some("+1555"));
        assert_eq!(query.limit, Some(10));
        assert!(query.offset.is_none());
    }

    #[test]
    fn upload_response_serializes() {
        let json = serde_json::to_value(UploadResponse {
            media_url: "http://localhost:8080/media/whatsapp-media/2024/05/01/a.png".into(),
            filename: "a.png".into(),
            size: 3,
        })
        .unwrap();
        assert_eq!(json["filename"], "a.png");
        assert_eq!(json["size"], 3);
    }
}

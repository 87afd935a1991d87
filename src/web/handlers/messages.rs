use crate::{
    core::message::{self, MessageView},
    errors::{Error, Result},
    web::{AppState, extractors::CurrentUser},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    content: String,
}

/// Latest page of a group's chat, oldest first. Viewing it marks it read.
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MessageView>>> {
    let limit = state.config.pages.messages;
    let page = message::list_messages(&state.db, account.id, id, limit).await?;
    Ok(Json(message::to_views(&state.db, account.id, page).await?))
}

pub async fn post(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<MessageBody>,
) -> Result<(StatusCode, Json<MessageView>)> {
    let created = message::post_message(&state.db, account.id, id, &body.content).await?;
    let message_id = created.id;
    let view = message::to_views(&state.db, account.id, vec![created])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("Message", message_id))?;
    Ok((StatusCode::CREATED, Json(view)))
}

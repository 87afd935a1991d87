use crate::{
    core::notification,
    entities::notification as notification_entity,
    errors::Result,
    web::{AppState, extractors::CurrentUser},
};
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// Newest notifications; reading the list marks them all read.
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<Vec<notification_entity::Model>>> {
    let limit = state.config.pages.notifications;
    Ok(Json(
        notification::list_notifications(&state.db, account.id, limit).await?,
    ))
}

pub async fn unread(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<Value>> {
    let count = notification::unread_notification_count(&state.db, account.id).await?;
    Ok(Json(json!({ "unread": count })))
}

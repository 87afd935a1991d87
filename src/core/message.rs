//! Group messaging - Posting, reading and unread tracking.
//!
//! Each member has one read marker per group holding the highest message id they
//! have seen. Posting refreshes every other member's single unread-messages
//! notification with the count of messages past their marker.

use crate::{
    core::{
        group,
        notification::{self, Notice},
    },
    entities::{
        GroupMessage, GroupMessageReadState, User, group_message, group_message_read_state, user,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
    prelude::*,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Message as shown in a thread
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    /// Message id
    pub id: i64,
    /// Author
    pub sender_id: i64,
    /// Author's username
    pub sender_username: String,
    /// Body
    pub content: String,
    /// Whether the viewer wrote it
    pub is_own: bool,
    /// When it was posted
    pub created_at: DateTimeUtc,
}

async fn ensure_member<C: ConnectionTrait>(conn: &C, group_id: i64, user_id: i64) -> Result<()> {
    if group::is_member(conn, group_id, user_id).await? {
        Ok(())
    } else {
        warn!("User {} is not a member of group {}", user_id, group_id);
        Err(Error::forbidden("You are not a member of this group."))
    }
}

async fn last_read_message_id<C: ConnectionTrait>(
    conn: &C,
    group_id: i64,
    user_id: i64,
) -> Result<Option<group_message_read_state::Model>> {
    GroupMessageReadState::find()
        .filter(group_message_read_state::Column::GroupId.eq(group_id))
        .filter(group_message_read_state::Column::UserId.eq(user_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Messages in the group newer than the user's read marker; all of them when the
/// user has never read the thread.
pub async fn unread_count<C: ConnectionTrait>(conn: &C, group_id: i64, user_id: i64) -> Result<u64> {
    let mut query = GroupMessage::find().filter(group_message::Column::GroupId.eq(group_id));
    if let Some(state) = last_read_message_id(conn, group_id, user_id).await? {
        query = query.filter(group_message::Column::Id.gt(state.last_read_message_id));
    }
    query.count(conn).await.map_err(Into::into)
}

/// Moves the read marker forward to `message_id`. Never moves it back.
async fn advance_read_state<C: ConnectionTrait>(
    conn: &C,
    group_id: i64,
    user_id: i64,
    message_id: i64,
) -> Result<()> {
    if let Some(state) = last_read_message_id(conn, group_id, user_id).await? {
        if state.last_read_message_id < message_id {
            let mut active: group_message_read_state::ActiveModel = state.into();
            active.last_read_message_id = Set(message_id);
            active.updated_at = Set(Utc::now());
            active.update(conn).await?;
        }
        return Ok(());
    }

    let row = group_message_read_state::ActiveModel {
        group_id: Set(group_id),
        user_id: Set(user_id),
        last_read_message_id: Set(message_id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    match row.insert(conn).await {
        Ok(_) => Ok(()),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            // Another request created the marker first; only ever raise it
            GroupMessageReadState::update_many()
                .set(group_message_read_state::ActiveModel {
                    last_read_message_id: Set(message_id),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                })
                .filter(group_message_read_state::Column::GroupId.eq(group_id))
                .filter(group_message_read_state::Column::UserId.eq(user_id))
                .filter(group_message_read_state::Column::LastReadMessageId.lt(message_id))
                .exec(conn)
                .await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Posts a message and refreshes every other member's unread notification.
///
/// # Errors
/// `Forbidden` for non-members, `Validation` for blank content.
pub async fn post_message(
    db: &DatabaseConnection,
    actor_id: i64,
    group_id: i64,
    content: &str,
) -> Result<group_message::Model> {
    let group_row = group::get_group(db, group_id).await?;
    ensure_member(db, group_row.id, actor_id).await?;
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::validation("Message cannot be empty."));
    }

    let txn = db.begin().await?;

    let created = group_message::ActiveModel {
        group_id: Set(group_row.id),
        sender_id: Set(actor_id),
        content: Set(content.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let recipients: Vec<i64> = group::member_ids(&txn, group_row.id)
        .await?
        .into_iter()
        .filter(|id| *id != actor_id)
        .collect();
    for member_id in &recipients {
        let unread = unread_count(&txn, group_row.id, *member_id).await?;
        notification::notify(
            &txn,
            &Notice::GroupMessages {
                user_id: *member_id,
                group_id: group_row.id,
                group_name: group_row.name.clone(),
                unread,
            },
        )
        .await?;
    }

    txn.commit().await?;

    info!(
        "User {} posted message {} in group {} ({} recipients)",
        actor_id,
        created.id,
        group_row.id,
        recipients.len()
    );
    Ok(created)
}

/// Returns the newest `limit` messages oldest-first, then marks them read for the
/// viewer and clears the viewer's unread notification for the group.
pub async fn list_messages(
    db: &DatabaseConnection,
    viewer_id: i64,
    group_id: i64,
    limit: u64,
) -> Result<Vec<group_message::Model>> {
    let group_row = group::get_group(db, group_id).await?;
    ensure_member(db, group_row.id, viewer_id).await?;

    let mut messages = GroupMessage::find()
        .filter(group_message::Column::GroupId.eq(group_row.id))
        .order_by_desc(group_message::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    messages.reverse();

    let txn = db.begin().await?;
    if let Some(newest) = messages.last() {
        advance_read_state(&txn, group_row.id, viewer_id, newest.id).await?;
    }
    notification::mark_group_messages_read(&txn, viewer_id, group_row.id).await?;
    txn.commit().await?;

    debug!(
        "User {} read {} messages in group {}",
        viewer_id,
        messages.len(),
        group_row.id
    );
    Ok(messages)
}

/// Attaches author names to messages for display.
pub async fn to_views(
    db: &DatabaseConnection,
    viewer_id: i64,
    messages: Vec<group_message::Model>,
) -> Result<Vec<MessageView>> {
    let mut sender_ids: Vec<i64> = messages.iter().map(|m| m.sender_id).collect();
    sender_ids.sort_unstable();
    sender_ids.dedup();
    let names: HashMap<i64, String> = if sender_ids.is_empty() {
        HashMap::new()
    } else {
        User::find()
            .filter(user::Column::Id.is_in(sender_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect()
    };

    Ok(messages
        .into_iter()
        .map(|m| MessageView {
            id: m.id,
            sender_id: m.sender_id,
            sender_username: names.get(&m.sender_id).cloned().unwrap_or_default(),
            content: m.content,
            is_own: m.sender_id == viewer_id,
            created_at: m.created_at,
        })
        .collect())
}

//! Notification fan-out.
//!
//! Each [`Notice`] variant maps to a [`NotificationKind`], and each kind declares how
//! repeated notices reach a recipient:
//! * [`FanOutPolicy::Accumulate`] inserts a new row every time.
//! * [`FanOutPolicy::ReplaceLatest`] keeps a single row per (recipient, kind, group),
//!   rewriting its text and flagging it unread again.

use crate::{
    entities::{Notification, NotificationKind, notification},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*,
    sea_query::Expr,
};
use tracing::debug;

/// How repeated notices of one kind reach a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutPolicy {
    /// Every notice becomes a new row
    Accumulate,
    /// One row per (recipient, kind, group) is updated in place
    ReplaceLatest,
}

impl NotificationKind {
    /// Fan-out policy of this kind.
    #[must_use]
    pub const fn fan_out_policy(self) -> FanOutPolicy {
        match self {
            Self::Donation | Self::GroupAdded => FanOutPolicy::Accumulate,
            Self::GroupMessages => FanOutPolicy::ReplaceLatest,
        }
    }
}

/// Something a user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A campaign received a donation; sent to the campaign owner
    Donation {
        /// Campaign owner
        owner_id: i64,
        /// Campaign that received it
        campaign_id: i64,
        /// Campaign title for the message text
        campaign_title: String,
    },
    /// A user was added to a donor group by its admin
    GroupAdded {
        /// Added user
        user_id: i64,
        /// Group joined
        group_id: i64,
        /// Group name for the message text
        group_name: String,
    },
    /// Unread messages are waiting in a group
    GroupMessages {
        /// Member to notify
        user_id: i64,
        /// Group with unread messages
        group_id: i64,
        /// Group name for the message text
        group_name: String,
        /// Messages after the member's read marker
        unread: u64,
    },
}

impl Notice {
    /// Kind recorded on the notification row.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::Donation { .. } => NotificationKind::Donation,
            Self::GroupAdded { .. } => NotificationKind::GroupAdded,
            Self::GroupMessages { .. } => NotificationKind::GroupMessages,
        }
    }

    /// User who receives the notice.
    #[must_use]
    pub const fn recipient(&self) -> i64 {
        match self {
            Self::Donation { owner_id, .. } => *owner_id,
            Self::GroupAdded { user_id, .. } | Self::GroupMessages { user_id, .. } => *user_id,
        }
    }

    /// Group the notice refers to.
    #[must_use]
    pub const fn group_id(&self) -> Option<i64> {
        match self {
            Self::Donation { .. } => None,
            Self::GroupAdded { group_id, .. } | Self::GroupMessages { group_id, .. } => {
                Some(*group_id)
            }
        }
    }

    /// Text shown to the recipient.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Donation { campaign_title, .. } => {
                format!("Campaign '{campaign_title}' received a new donation.")
            }
            Self::GroupAdded { group_name, .. } => {
                format!("You were added to the group '{group_name}'.")
            }
            Self::GroupMessages {
                group_name, unread, ..
            } => {
                let noun = if *unread == 1 { "message" } else { "messages" };
                format!("{unread} unread {noun} in '{group_name}'")
            }
        }
    }

    /// Link the notification points to.
    #[must_use]
    pub fn url(&self) -> String {
        match self {
            Self::Donation { campaign_id, .. } => format!("/campaigns/{campaign_id}/"),
            Self::GroupAdded { group_id, .. } => format!("/groups/{group_id}/"),
            Self::GroupMessages { group_id, .. } => format!("/groups/{group_id}/messages/"),
        }
    }
}

/// Delivers a notice according to its kind's fan-out policy.
///
/// Takes any connection so callers can run it inside their own transaction.
pub async fn notify<C: ConnectionTrait>(conn: &C, notice: &Notice) -> Result<notification::Model> {
    let kind = notice.kind();
    let now = Utc::now();

    if kind.fan_out_policy() == FanOutPolicy::ReplaceLatest {
        let mut existing = Notification::find()
            .filter(notification::Column::UserId.eq(notice.recipient()))
            .filter(notification::Column::Kind.eq(kind));
        existing = match notice.group_id() {
            Some(group_id) => existing.filter(notification::Column::GroupId.eq(group_id)),
            None => existing.filter(notification::Column::GroupId.is_null()),
        };

        if let Some(row) = existing.one(conn).await? {
            let mut active: notification::ActiveModel = row.into();
            active.message = Set(notice.message());
            active.url = Set(notice.url());
            active.is_read = Set(false);
            active.updated_at = Set(now);
            let updated = active.update(conn).await?;
            debug!(
                "Refreshed {:?} notification {} for user {}",
                kind, updated.id, updated.user_id
            );
            return Ok(updated);
        }
    }

    let row = notification::ActiveModel {
        user_id: Set(notice.recipient()),
        kind: Set(kind),
        message: Set(notice.message()),
        url: Set(notice.url()),
        group_id: Set(notice.group_id()),
        is_read: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = row.insert(conn).await?;
    debug!(
        "Created {:?} notification {} for user {}",
        kind, created.id, created.user_id
    );
    Ok(created)
}

/// Returns the newest notifications of a user, then marks all of their unread
/// notifications as read.
///
/// The returned rows carry the read flags as they were before the call, so the
/// caller can still highlight what was new.
pub async fn list_notifications(
    db: &DatabaseConnection,
    user_id: i64,
    limit: u64,
) -> Result<Vec<notification::Model>> {
    let items = Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .limit(limit)
        .all(db)
        .await?;

    Notification::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(db)
        .await?;

    Ok(items)
}

/// Number of unread notifications of a user.
pub async fn unread_notification_count<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<u64> {
    Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .count(conn)
        .await
        .map_err(Into::into)
}

/// Marks a user's unread-messages notification for one group as read.
pub async fn mark_group_messages_read<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    group_id: i64,
) -> Result<()> {
    Notification::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::Kind.eq(NotificationKind::GroupMessages))
        .filter(notification::Column::GroupId.eq(group_id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(conn)
        .await?;
    Ok(())
}

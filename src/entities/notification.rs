//! Notification entity - In-app notices created as side effects of other actions.
//!
//! The fan-out rules per kind live in [`crate::core::notification`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What triggered the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A campaign received a donation
    #[sea_orm(string_value = "donation")]
    Donation,
    /// The user was added to a donor group
    #[sea_orm(string_value = "group_added")]
    GroupAdded,
    /// Unread messages are waiting in a donor group
    #[sea_orm(string_value = "group_messages")]
    GroupMessages,
}

/// Notification database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipient
    pub user_id: i64,
    /// Trigger
    pub kind: NotificationKind,
    /// Text shown to the recipient
    pub message: String,
    /// Where the notification leads
    pub url: String,
    /// Group the notice refers to, when any
    pub group_id: Option<i64>,
    /// Whether the recipient has seen it
    pub is_read: bool,
    /// When it was first created
    pub created_at: DateTimeUtc,
    /// When its text last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Notification and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Recipient
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Group message entity - Chat messages posted by members.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group message database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_messages")]
pub struct Model {
    /// Unique identifier, increasing with posting order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group the message was posted to
    pub group_id: i64,
    /// Member who posted it
    pub sender_id: i64,
    /// Message body
    #[sea_orm(column_type = "Text")]
    pub content: String,
    /// When it was posted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `GroupMessage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Group the message was posted in
    #[sea_orm(
        belongs_to = "super::donor_group::Entity",
        from = "Column::GroupId",
        to = "super::donor_group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
    /// Author of the message
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Sender,
}

impl Related<super::donor_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sender.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

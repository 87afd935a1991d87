//! Group membership entity - One row per (group, user); a unique index backs the pair.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group membership database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_memberships")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group joined
    pub group_id: i64,
    /// Member
    pub user_id: i64,
    /// When the user joined
    pub joined_at: DateTimeUtc,
}

/// Defines relationships between `GroupMembership` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Group the membership belongs to
    #[sea_orm(
        belongs_to = "super::donor_group::Entity",
        from = "Column::GroupId",
        to = "super::donor_group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
    /// Member
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::donor_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Donor group entity - Donors pooling their giving under one join code.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Donor group database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donor_groups")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group name
    pub name: String,
    /// Optional description
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Creator and administrator, always a member
    pub admin_id: i64,
    /// Upper-case alphanumeric code shared to invite members
    #[sea_orm(unique)]
    pub join_code: String,
    /// When the group was created
    pub created_at: DateTimeUtc,
    /// Last modification
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `DonorGroup` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The administrating user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AdminId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Admin,
    /// Memberships of the group
    #[sea_orm(has_many = "super::group_membership::Entity")]
    Memberships,
    /// Messages posted to the group
    #[sea_orm(has_many = "super::group_message::Entity")]
    Messages,
}

impl Related<super::group_membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::group_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

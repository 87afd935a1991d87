//! Read marker per (group, user). `last_read_message_id` only ever moves forward.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Read state database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_message_read_states")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group being read
    pub group_id: i64,
    /// Reader
    pub user_id: i64,
    /// Highest message id the reader has seen
    pub last_read_message_id: i64,
    /// Last time the marker moved
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `GroupMessageReadState` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Group the marker tracks
    #[sea_orm(
        belongs_to = "super::donor_group::Entity",
        from = "Column::GroupId",
        to = "super::donor_group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
}

impl ActiveModelBehavior for ActiveModel {}

//! Join table between campaigns and tags.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Campaign/tag link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_tags")]
pub struct Model {
    /// Campaign side of the link
    #[sea_orm(primary_key, auto_increment = false)]
    pub campaign_id: i64,
    /// Tag side of the link
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag_id: i64,
}

/// Defines relationships between `CampaignTag` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Linked campaign
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id",
        on_delete = "Cascade"
    )]
    Campaign,
    /// Linked tag
    #[sea_orm(
        belongs_to = "super::tag::Entity",
        from = "Column::TagId",
        to = "super::tag::Column::Id",
        on_delete = "Cascade"
    )]
    Tag,
}

impl ActiveModelBehavior for ActiveModel {}

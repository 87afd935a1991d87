//! Join table between campaigns and categories.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Campaign/category link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_categories")]
pub struct Model {
    /// Campaign side of the link
    #[sea_orm(primary_key, auto_increment = false)]
    pub campaign_id: i64,
    /// Category side of the link
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_id: i64,
}

/// Defines relationships between `CampaignCategory` and other entities
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
    /// Linked category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
}

impl ActiveModelBehavior for ActiveModel {}

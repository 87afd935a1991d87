//! Campaign update entity - Progress posts written by the campaign owner.
//!
//! `content_md` is stored as written; rendering it is left to the presentation layer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Campaign update database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_updates")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Campaign the update belongs to
    pub campaign_id: i64,
    /// Headline
    pub title: String,
    /// Markdown body
    #[sea_orm(column_type = "Text")]
    pub content_md: String,
    /// Optional illustration URL
    pub image_url: String,
    /// When the update was posted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `CampaignUpdate` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each update belongs to one campaign
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id",
        on_delete = "Cascade"
    )]
    Campaign,
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

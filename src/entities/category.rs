//! Category entity - Broad campaign classification, addressed by slug.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    #[sea_orm(unique)]
    pub name: String,
    /// URL-safe form of the name
    #[sea_orm(unique)]
    pub slug: String,
}

/// Categories link to campaigns through `campaign_categories`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

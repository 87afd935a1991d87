//! Campaign entity - A fundraiser's appeal with a goal and a deadline.
//!
//! The goal is persisted in minor units (see [`crate::core::money`]) so every
//! backend stores it exactly.

use crate::core::money::{self, Precision};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Campaign database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    /// Unique identifier for the campaign
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Fundraiser who owns the campaign
    pub owner_id: i64,
    /// Headline
    pub title: String,
    /// Long description
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Cover image URL, may be empty
    pub image_url: String,
    /// QR code image for direct transfers, may be empty
    pub donate_qr_image_url: String,
    /// Goal in minor units of [`Precision::CAMPAIGN_GOAL`]
    pub goal_amount_minor: i64,
    /// Last day the campaign accepts support
    pub end_date: Date,
    /// When the campaign was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Goal as a fixed-point decimal.
    #[must_use]
    pub fn goal_amount(&self) -> Decimal {
        money::from_minor_units(self.goal_amount_minor, Precision::CAMPAIGN_GOAL)
    }

    /// A campaign stays active through its end date.
    #[must_use]
    pub fn is_active(&self, today: Date) -> bool {
        self.end_date >= today
    }
}

/// Defines relationships between Campaign and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each campaign belongs to its owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    /// One campaign has many donations
    #[sea_orm(has_many = "super::donation::Entity")]
    Donations,
    /// One campaign has many updates
    #[sea_orm(has_many = "super::campaign_update::Entity")]
    Updates,
    /// One campaign has many events
    #[sea_orm(has_many = "super::event::Entity")]
    Events,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donations.def()
    }
}

impl Related<super::campaign_update::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Updates.def()
    }
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

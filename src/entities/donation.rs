//! Donation entity - A donor's pledge to a campaign, pending until the owner decides.
//!
//! Amounts are persisted in minor units of [`Precision::DONATION_AMOUNT`]. Only
//! approved donations count toward campaign totals.

use crate::core::money::{self, Precision};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Approval state of a donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    /// Waiting for the campaign owner
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted by the campaign owner
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Declined by the campaign owner
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl DonationStatus {
    /// Stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Donation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Campaign receiving the donation
    pub campaign_id: i64,
    /// Donor who submitted it
    pub donor_id: i64,
    /// Donor group the donation was made on behalf of
    pub group_id: Option<i64>,
    /// Amount in minor units
    pub amount_minor: i64,
    /// Approval state
    pub status: DonationStatus,
    /// Owner who approved or rejected
    pub decided_by: Option<i64>,
    /// When the decision was made
    pub decided_at: Option<DateTimeUtc>,
    /// Hide the donor's name in public listings
    pub is_anonymous: bool,
    /// Optional public name, overrides the username
    pub display_name: String,
    /// When the donation was submitted
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Amount as a fixed-point decimal.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        money::from_minor_units(self.amount_minor, Precision::DONATION_AMOUNT)
    }
}

/// Defines relationships between Donation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each donation belongs to one campaign
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id",
        on_delete = "Cascade"
    )]
    Campaign,
    /// Each donation was made by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DonorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Donor,
    /// Optional donor group
    #[sea_orm(
        belongs_to = "super::donor_group::Entity",
        from = "Column::GroupId",
        to = "super::donor_group::Column::Id",
        on_delete = "SetNull"
    )]
    Group,
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donor.def()
    }
}

impl Related<super::donor_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

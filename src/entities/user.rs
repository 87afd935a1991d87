//! User entity - Accounts and their profile attributes.
//!
//! Each user carries a role chosen at registration. The role decides whether the
//! account may run campaigns (fundraiser) or donate and join donor groups (donor).
//! No update path in the crate writes the role column after the row is inserted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account role, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Contributes to campaigns and joins donor groups
    #[sea_orm(string_value = "donor")]
    Donor,
    /// Creates and manages campaigns
    #[sea_orm(string_value = "fundraiser")]
    Fundraiser,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, letters, digits and underscores
    #[sea_orm(unique)]
    pub username: String,
    /// Contact address, unique across accounts
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Donor or fundraiser
    pub role: UserRole,
    /// Optional phone number, empty when not given
    pub phone: String,
    /// Display name
    pub full_name: String,
    /// Required for fundraisers
    #[sea_orm(column_type = "Text")]
    pub biography: String,
    /// Free-text interests
    #[sea_orm(column_type = "Text")]
    pub interests: String,
    /// Avatar image URL
    pub avatar_url: String,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Whether this account may create campaigns.
    #[must_use]
    pub fn can_fundraise(&self) -> bool {
        self.role == UserRole::Fundraiser
    }

    /// Whether this account is a donor.
    #[must_use]
    pub fn is_donor(&self) -> bool {
        self.role == UserRole::Donor
    }
}

/// Users have no relations declared from this side
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

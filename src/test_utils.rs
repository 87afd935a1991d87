//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        campaign::{self, NewCampaign},
        donation::{self, DonationInput},
        group::{self, DEFAULT_JOIN_CODE_LENGTH, NewGroup},
    },
    entities::{UserRole, campaign as campaign_entity, donation as donation_entity, donor_group, user},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Stored in place of a real Argon2 hash; hashing is slow and not under test here.
pub const TEST_PASSWORD_HASH: &str = "not-a-real-hash";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Inserts a user directly, skipping password hashing.
///
/// # Defaults
/// * `email`: `{username}@example.com`
/// * `biography`: "Test biography"
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    role: UserRole,
) -> Result<user::Model> {
    let row = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set(TEST_PASSWORD_HASH.to_string()),
        role: Set(role),
        phone: Set(String::new()),
        full_name: Set(String::new()),
        biography: Set("Test biography".to_string()),
        interests: Set(String::new()),
        avatar_url: Set(String::new()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Creates a donor account.
pub async fn create_test_donor(db: &DatabaseConnection, username: &str) -> Result<user::Model> {
    create_test_user(db, username, UserRole::Donor).await
}

/// Creates a fundraiser account.
pub async fn create_test_fundraiser(
    db: &DatabaseConnection,
    username: &str,
) -> Result<user::Model> {
    create_test_user(db, username, UserRole::Fundraiser).await
}

/// Creates a campaign owned by `owner`.
///
/// # Defaults
/// * `goal_amount`: 1000
/// * `end_date`: 2099-12-31
pub async fn create_test_campaign(
    db: &DatabaseConnection,
    owner: &user::Model,
    title: &str,
) -> Result<campaign_entity::Model> {
    campaign::create_campaign(
        db,
        owner,
        NewCampaign {
            title: title.to_string(),
            description: format!("{title} description"),
            goal_amount: "1000".to_string(),
            end_date: "2099-12-31".to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Creates a fundraiser, a donor and a campaign owned by the fundraiser.
/// Returns `(owner, donor, campaign)`.
pub async fn setup_with_campaign(
    db: &DatabaseConnection,
) -> Result<(user::Model, user::Model, campaign_entity::Model)> {
    let owner = create_test_fundraiser(db, "test_owner").await?;
    let donor = create_test_donor(db, "test_donor").await?;
    let campaign = create_test_campaign(db, &owner, "Test Campaign").await?;
    Ok((owner, donor, campaign))
}

/// Submits a plain pending donation.
pub async fn create_test_donation(
    db: &DatabaseConnection,
    donor: &user::Model,
    campaign_id: i64,
    amount: &str,
) -> Result<donation_entity::Model> {
    donation::submit_donation(
        db,
        donor,
        campaign_id,
        DonationInput {
            amount: amount.to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Creates a donor group administered by `admin`.
pub async fn create_test_group(
    db: &DatabaseConnection,
    admin: &user::Model,
    name: &str,
) -> Result<donor_group::Model> {
    group::create_group(
        db,
        admin,
        NewGroup {
            name: name.to_string(),
            description: String::new(),
        },
        DEFAULT_JOIN_CODE_LENGTH,
    )
    .await
}

/// Creates a donor admin and their group. Returns `(admin, group)`.
pub async fn setup_with_group(db: &DatabaseConnection) -> Result<(user::Model, donor_group::Model)> {
    let admin = create_test_donor(db, "group_admin").await?;
    let group = create_test_group(db, &admin, "Test Group").await?;
    Ok((admin, group))
}

//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite unique indexes, which the
//! entity derives cannot express, are created explicitly afterwards. Every statement is
//! `IF NOT EXISTS`, so startup against an existing database is a no-op.

use crate::entities::{
    Campaign, CampaignCategory, CampaignTag, CampaignUpdate, Category, Donation, DonorGroup,
    Event, GroupMembership, GroupMessage, GroupMessageReadState, Notification, Tag, User,
    group_membership, group_message_read_state,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DATABASE_URL: &str = "sqlite://data/crowdfund.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file under `data/` if no environment variable is
/// set, creating the directory when needed.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let url = get_database_url();
    if url == DEFAULT_DATABASE_URL {
        std::fs::create_dir_all(DEFAULT_DATA_DIR)?;
    }
    Database::connect(&url).await.map_err(Into::into)
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<()> {
    let builder = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(builder.build(&stmt)).await?;
    Ok(())
}

/// Creates all tables and indexes.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Category).await?;
    create_table(db, &schema, Tag).await?;
    create_table(db, &schema, Campaign).await?;
    create_table(db, &schema, CampaignCategory).await?;
    create_table(db, &schema, CampaignTag).await?;
    create_table(db, &schema, CampaignUpdate).await?;
    create_table(db, &schema, Event).await?;
    create_table(db, &schema, DonorGroup).await?;
    create_table(db, &schema, Donation).await?;
    create_table(db, &schema, GroupMembership).await?;
    create_table(db, &schema, GroupMessage).await?;
    create_table(db, &schema, GroupMessageReadState).await?;
    create_table(db, &schema, Notification).await?;

    let membership_index = Index::create()
        .name("ux_group_memberships_group_user")
        .table(GroupMembership)
        .col(group_membership::Column::GroupId)
        .col(group_membership::Column::UserId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&membership_index)).await?;

    let read_state_index = Index::create()
        .name("ux_group_message_read_states_group_user")
        .table(GroupMessageReadState)
        .col(group_message_read_state::Column::GroupId)
        .col(group_message_read_state::Column::UserId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&read_state_index)).await?;

    // One outstanding unread-messages notice per recipient and group
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_notifications_group_messages \
         ON notifications (user_id, group_id) WHERE kind = 'group_messages'",
    )
    .await?;

    Ok(())
}

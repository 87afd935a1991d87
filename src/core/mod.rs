//! Core business logic, independent of the HTTP layer.
//!
//! Functions take a `DatabaseConnection` (or any `ConnectionTrait` when they are
//! meant to compose inside a caller's transaction) and return [`crate::errors::Result`].

/// Campaigns, categories, tags, updates, events and totals
pub mod campaign;
/// Donation submission, decisions and lists
pub mod donation;
/// Donor groups and memberships
pub mod group;
/// Group messages and read markers
pub mod message;
/// Fixed-point money helpers
pub mod money;
/// Notification fan-out and inbox
pub mod notification;
/// Accounts and profiles
pub mod user;

//! Donor group business logic - Creation, joining, membership management and group pages.
//!
//! Groups are made of donors only. The creator becomes the administrator and is
//! always a member: the group row and the admin's membership are committed together,
//! the admin cannot leave, and nobody can remove them.

use crate::{
    core::{
        donation::{self, DonationView},
        notification::{self, Notice},
        user as users,
    },
    entities::{DonorGroup, GroupMembership, User, donor_group, group_membership, user},
    errors::{Error, Result},
};
use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ConnectionTrait, DbErr, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Characters a join code is drawn from
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Default join code length
pub const DEFAULT_JOIN_CODE_LENGTH: usize = 8;
const MAX_CODE_ATTEMPTS: usize = 5;

/// Group creation form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGroup {
    /// Group name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: String,
}

/// Result of a join or add request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    /// A membership was created
    Joined,
    /// The user already belonged to the group; nothing changed
    AlreadyMember,
}

/// Member as listed on the group page
#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    /// Member's user id
    pub user_id: i64,
    /// Member's username
    pub username: String,
    /// Member's display name
    pub full_name: String,
    /// Whether the member administers the group
    pub is_admin: bool,
    /// When they joined
    pub joined_at: DateTimeUtc,
}

/// Group page
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    /// The group row
    #[serde(flatten)]
    pub group: donor_group::Model,
    /// Members in joining order
    pub members: Vec<MemberView>,
    /// Whether the viewer administers the group
    pub is_admin: bool,
    /// Whether the viewer is a member
    pub is_member: bool,
    /// Recent donations made on behalf of the group, shown to members only
    pub donations: Vec<DonationView>,
}

/// Draws a join code of `length` characters from a cryptographically secure RNG.
#[must_use]
pub fn generate_join_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())]))
        .collect()
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn ensure_donor(actor: &user::Model, action: &str) -> Result<()> {
    if actor.is_donor() {
        Ok(())
    } else {
        warn!("Non-donor {} tried to {}", actor.id, action);
        Err(Error::forbidden(format!("Only donors can {action}.")))
    }
}

/// Loads a group, failing with `NotFound` when missing.
pub async fn get_group<C: ConnectionTrait>(conn: &C, group_id: i64) -> Result<donor_group::Model> {
    DonorGroup::find_by_id(group_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Group", group_id))
}

/// Whether `user_id` belongs to the group.
pub async fn is_member<C: ConnectionTrait>(conn: &C, group_id: i64, user_id: i64) -> Result<bool> {
    Ok(find_membership(conn, group_id, user_id).await?.is_some())
}

async fn find_membership<C: ConnectionTrait>(
    conn: &C,
    group_id: i64,
    user_id: i64,
) -> Result<Option<group_membership::Model>> {
    GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group_id))
        .filter(group_membership::Column::UserId.eq(user_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Inserts a membership unless one exists. A duplicate caught by the unique index
/// is reported as [`JoinOutcome::AlreadyMember`].
async fn insert_membership<C: ConnectionTrait>(
    conn: &C,
    group_id: i64,
    user_id: i64,
) -> Result<JoinOutcome> {
    if find_membership(conn, group_id, user_id).await?.is_some() {
        return Ok(JoinOutcome::AlreadyMember);
    }
    let row = group_membership::ActiveModel {
        group_id: Set(group_id),
        user_id: Set(user_id),
        joined_at: Set(Utc::now()),
        ..Default::default()
    };
    match row.insert(conn).await {
        Ok(_) => Ok(JoinOutcome::Joined),
        Err(err) if is_unique_violation(&err) => Ok(JoinOutcome::AlreadyMember),
        Err(err) => Err(err.into()),
    }
}

/// Creates a group administered by `actor`, who becomes its first member.
///
/// # Arguments
/// * `db` - Database connection
/// * `actor` - Creator, must be a donor
/// * `input` - Name and description
/// * `code_length` - Join code length
///
/// # Errors
/// `Forbidden` for non-donors, `Validation` for an empty name, `Conflict` when no
/// unused join code could be drawn.
pub async fn create_group(
    db: &DatabaseConnection,
    actor: &user::Model,
    input: NewGroup,
    code_length: usize,
) -> Result<donor_group::Model> {
    ensure_donor(actor, "create groups")?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("Group name is required."));
    }
    let description = input.description.trim().to_string();

    let txn = db.begin().await?;

    let mut created = None;
    for _ in 0..MAX_CODE_ATTEMPTS {
        let now = Utc::now();
        let row = donor_group::ActiveModel {
            name: Set(name.clone()),
            description: Set(description.clone()),
            admin_id: Set(actor.id),
            join_code: Set(generate_join_code(code_length)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        match row.insert(&txn).await {
            Ok(group) => {
                created = Some(group);
                break;
            }
            Err(err) if is_unique_violation(&err) => {
                warn!("Join code collision, drawing a new one");
            }
            Err(err) => return Err(err.into()),
        }
    }
    let Some(group) = created else {
        return Err(Error::Conflict {
            message: "Could not allocate a unique join code.".to_string(),
        });
    };

    insert_membership(&txn, group.id, actor.id).await?;
    txn.commit().await?;

    info!(
        "User {} created group {} '{}'",
        actor.id, group.id, group.name
    );
    Ok(group)
}

/// Joins the group whose code matches. The code is trimmed and upper-cased first.
///
/// # Errors
/// `Forbidden` for non-donors, `NotFound` for an unknown code.
pub async fn join_by_code(
    db: &DatabaseConnection,
    actor: &user::Model,
    code: &str,
) -> Result<(donor_group::Model, JoinOutcome)> {
    ensure_donor(actor, "join groups")?;
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(Error::validation("Group code is required."));
    }

    let group = DonorGroup::find()
        .filter(donor_group::Column::JoinCode.eq(code.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Group with code", &code))?;

    let outcome = insert_membership(db, group.id, actor.id).await?;
    match outcome {
        JoinOutcome::Joined => info!("User {} joined group {}", actor.id, group.id),
        JoinOutcome::AlreadyMember => {
            info!("User {} is already a member of group {}", actor.id, group.id);
        }
    }
    Ok((group, outcome))
}

/// Adds a donor to the group by username and notifies them. Admin only.
///
/// # Errors
/// `Forbidden` when the actor is not the admin or the target is not a donor,
/// `NotFound` for an unknown username.
pub async fn add_member(
    db: &DatabaseConnection,
    actor_id: i64,
    group_id: i64,
    username: &str,
) -> Result<(user::Model, JoinOutcome)> {
    let group = get_group(db, group_id).await?;
    if group.admin_id != actor_id {
        return Err(Error::forbidden("Only the group administrator can add members."));
    }
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::validation("Username is required."));
    }
    let target = users::get_user_by_username(db, username)
        .await?
        .ok_or_else(|| Error::not_found("User", username))?;
    if !target.is_donor() {
        return Err(Error::forbidden("Only donors can be members of donor groups."));
    }

    let txn = db.begin().await?;
    let outcome = insert_membership(&txn, group.id, target.id).await?;
    if outcome == JoinOutcome::Joined {
        notification::notify(
            &txn,
            &Notice::GroupAdded {
                user_id: target.id,
                group_id: group.id,
                group_name: group.name.clone(),
            },
        )
        .await?;
    }
    txn.commit().await?;

    info!(
        "Admin {} added user {} to group {} ({:?})",
        actor_id, target.id, group.id, outcome
    );
    Ok((target, outcome))
}

/// Leaves a group.
///
/// # Errors
/// `AdminCannotLeave` for the administrator, `NotFound` when not a member.
pub async fn leave_group(db: &DatabaseConnection, actor_id: i64, group_id: i64) -> Result<()> {
    let group = get_group(db, group_id).await?;
    if group.admin_id == actor_id {
        return Err(Error::AdminCannotLeave);
    }
    let membership = find_membership(db, group.id, actor_id)
        .await?
        .ok_or_else(|| Error::not_found("Membership", format!("{actor_id} in group {group_id}")))?;

    GroupMembership::delete_by_id(membership.id).exec(db).await?;
    info!("User {} left group {}", actor_id, group.id);
    Ok(())
}

/// Removes a member. Admin only; the admin cannot be removed.
pub async fn remove_member(
    db: &DatabaseConnection,
    actor_id: i64,
    group_id: i64,
    user_id: i64,
) -> Result<()> {
    let group = get_group(db, group_id).await?;
    if group.admin_id != actor_id {
        warn!("User {} tried to remove members of group {}", actor_id, group.id);
        return Err(Error::forbidden(
            "Only the group administrator can remove members.",
        ));
    }
    if user_id == group.admin_id {
        return Err(Error::CannotRemoveAdmin);
    }
    users::require_user(db, user_id).await?;
    let membership = find_membership(db, group.id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("Membership", format!("{user_id} in group {group_id}")))?;

    GroupMembership::delete_by_id(membership.id).exec(db).await?;
    info!("Admin {} removed user {} from group {}", actor_id, user_id, group.id);
    Ok(())
}

/// Member ids of a group in joining order.
pub async fn member_ids<C: ConnectionTrait>(conn: &C, group_id: i64) -> Result<Vec<i64>> {
    GroupMembership::find()
        .select_only()
        .column(group_membership::Column::UserId)
        .filter(group_membership::Column::GroupId.eq(group_id))
        .order_by_asc(group_membership::Column::Id)
        .into_tuple()
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Builds the group page as seen by `viewer_id`.
pub async fn get_group_detail(
    db: &DatabaseConnection,
    group_id: i64,
    viewer_id: i64,
    donation_limit: u64,
) -> Result<GroupDetail> {
    let group = get_group(db, group_id).await?;
    let memberships = GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group.id))
        .order_by_asc(group_membership::Column::JoinedAt)
        .order_by_asc(group_membership::Column::Id)
        .all(db)
        .await?;

    let user_ids: Vec<i64> = memberships.iter().map(|m| m.user_id).collect();
    let mut accounts: HashMap<i64, user::Model> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };

    let members: Vec<MemberView> = memberships
        .into_iter()
        .filter_map(|m| {
            accounts.remove(&m.user_id).map(|account| MemberView {
                user_id: account.id,
                username: account.username,
                full_name: account.full_name,
                is_admin: account.id == group.admin_id,
                joined_at: m.joined_at,
            })
        })
        .collect();

    let is_member = members.iter().any(|m| m.user_id == viewer_id);
    let donations = if is_member {
        donation::group_donations(db, group.id, donation_limit).await?
    } else {
        Vec::new()
    };

    Ok(GroupDetail {
        is_admin: group.admin_id == viewer_id,
        is_member,
        members,
        donations,
        group,
    })
}

/// All groups, newest first.
pub async fn list_groups(db: &DatabaseConnection) -> Result<Vec<donor_group::Model>> {
    DonorGroup::find()
        .order_by_desc(donor_group::Column::CreatedAt)
        .order_by_desc(donor_group::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Groups the user belongs to, newest first.
pub async fn list_groups_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<donor_group::Model>> {
    let group_ids: Vec<i64> = GroupMembership::find()
        .select_only()
        .column(group_membership::Column::GroupId)
        .filter(group_membership::Column::UserId.eq(user_id))
        .into_tuple()
        .all(db)
        .await?;
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }
    DonorGroup::find()
        .filter(donor_group::Column::Id.is_in(group_ids))
        .order_by_desc(donor_group::Column::CreatedAt)
        .order_by_desc(donor_group::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::notification::unread_notification_count;
    use crate::test_utils::*;

    #[test]
    fn test_generate_join_code() {
        let code = generate_join_code(DEFAULT_JOIN_CODE_LENGTH);
        assert_eq!(code.len(), 8);
        assert!(code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)));
        assert_eq!(generate_join_code(12).len(), 12);
    }

    #[tokio::test]
    async fn test_create_group_adds_admin_as_member() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_donor(&db, "admin").await?;

        let group = create_group(
            &db,
            &admin,
            NewGroup {
                name: "  Book Club ".to_string(),
                description: "Reading together".to_string(),
            },
            DEFAULT_JOIN_CODE_LENGTH,
        )
        .await?;
        assert_eq!(group.name, "Book Club");
        assert_eq!(group.admin_id, admin.id);
        assert_eq!(group.join_code.len(), 8);
        assert!(is_member(&db, group.id, admin.id).await?);

        let other = create_test_group(&db, &admin, "Second").await?;
        assert_ne!(group.join_code, other.join_code);
        assert_eq!(list_groups_for_user(&db, admin.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_group_requires_donor_and_name() -> Result<()> {
        let db = setup_test_db().await?;
        let fundraiser = create_test_fundraiser(&db, "fund").await?;
        let donor = create_test_donor(&db, "donor").await?;

        let err = create_group(&db, &fundraiser, NewGroup::default(), 8)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        let err = create_group(
            &db,
            &donor,
            NewGroup {
                name: "   ".to_string(),
                ..Default::default()
            },
            8,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(list_groups(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_join_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, group) = setup_with_group(&db).await?;
        let member = create_test_donor(&db, "member").await?;

        let lower = format!("  {} ", group.join_code.to_lowercase());
        let (joined, outcome) = join_by_code(&db, &member, &lower).await?;
        assert_eq!(joined.id, group.id);
        assert_eq!(outcome, JoinOutcome::Joined);

        let (_, outcome) = join_by_code(&db, &member, &group.join_code).await?;
        assert_eq!(outcome, JoinOutcome::AlreadyMember);
        let (_, outcome) = join_by_code(&db, &admin, &group.join_code).await?;
        assert_eq!(outcome, JoinOutcome::AlreadyMember);

        assert_eq!(member_ids(&db, group.id).await?, vec![admin.id, member.id]);

        assert!(matches!(
            join_by_code(&db, &member, "NOPE0000").await,
            Err(Error::NotFound { .. })
        ));
        let fundraiser = create_test_fundraiser(&db, "fund").await?;
        assert!(matches!(
            join_by_code(&db, &fundraiser, &group.join_code).await,
            Err(Error::Forbidden { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_cannot_leave_or_be_removed() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, group) = setup_with_group(&db).await?;
        let member = create_test_donor(&db, "member").await?;
        join_by_code(&db, &member, &group.join_code).await?;

        assert!(matches!(
            leave_group(&db, admin.id, group.id).await,
            Err(Error::AdminCannotLeave)
        ));
        assert!(matches!(
            remove_member(&db, admin.id, group.id, admin.id).await,
            Err(Error::CannotRemoveAdmin)
        ));
        assert!(matches!(
            remove_member(&db, member.id, group.id, admin.id).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(is_member(&db, group.id, admin.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_leave_and_remove() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, group) = setup_with_group(&db).await?;
        let first = create_test_donor(&db, "first").await?;
        let second = create_test_donor(&db, "second").await?;
        join_by_code(&db, &first, &group.join_code).await?;
        join_by_code(&db, &second, &group.join_code).await?;

        leave_group(&db, first.id, group.id).await?;
        assert!(!is_member(&db, group.id, first.id).await?);
        assert!(matches!(
            leave_group(&db, first.id, group.id).await,
            Err(Error::NotFound { .. })
        ));

        remove_member(&db, admin.id, group.id, second.id).await?;
        assert!(!is_member(&db, group.id, second.id).await?);
        assert!(matches!(
            remove_member(&db, admin.id, group.id, second.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_member_notifies_target() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, group) = setup_with_group(&db).await?;
        let target = create_test_donor(&db, "target").await?;
        let fundraiser = create_test_fundraiser(&db, "fund").await?;

        let (added, outcome) = add_member(&db, admin.id, group.id, " target ").await?;
        assert_eq!(added.id, target.id);
        assert_eq!(outcome, JoinOutcome::Joined);
        assert_eq!(unread_notification_count(&db, target.id).await?, 1);

        let (_, outcome) = add_member(&db, admin.id, group.id, "target").await?;
        assert_eq!(outcome, JoinOutcome::AlreadyMember);
        assert_eq!(unread_notification_count(&db, target.id).await?, 1);

        assert!(matches!(
            add_member(&db, target.id, group.id, "admin").await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            add_member(&db, admin.id, group.id, &fundraiser.username).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            add_member(&db, admin.id, group.id, "ghost").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_group_detail_flags() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, group) = setup_with_group(&db).await?;
        let outsider = create_test_donor(&db, "outsider").await?;

        let detail = get_group_detail(&db, group.id, admin.id, 20).await?;
        assert!(detail.is_admin);
        assert!(detail.is_member);
        assert_eq!(detail.members.len(), 1);
        assert!(detail.members[0].is_admin);

        let detail = get_group_detail(&db, group.id, outsider.id, 20).await?;
        assert!(!detail.is_admin);
        assert!(!detail.is_member);
        assert!(detail.donations.is_empty());
        Ok(())
    }
}

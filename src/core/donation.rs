//! Donation business logic - Submission, owner decisions and donation lists.
//!
//! A donation starts `pending` and moves to `approved` or `rejected` exactly once.
//! The decision is a conditional update on `status = 'pending'`, so two concurrent
//! decisions cannot both succeed.

use crate::{
    core::{
        campaign::{self, CampaignTotals},
        group,
        money::{self, Precision},
        notification::{self, Notice},
    },
    entities::{
        Campaign, Donation, DonationStatus, DonorGroup, User, campaign as campaign_entity,
        donation, donor_group, user,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

const AMOUNT_FIELD: &str = "Donation amount";
const ANONYMOUS: &str = "Anonymous";

/// Donation form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonationInput {
    /// Amount as a decimal string
    pub amount: String,
    /// Hide the donor's name in public lists
    #[serde(default)]
    pub is_anonymous: bool,
    /// Optional public name
    #[serde(default)]
    pub display_name: String,
    /// Donor group to give on behalf of
    #[serde(default)]
    pub group_id: Option<i64>,
}

/// Owner decision on a pending donation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Count the donation toward the campaign
    Approve,
    /// Discard the donation
    Reject,
}

impl Decision {
    const fn status(self) -> DonationStatus {
        match self {
            Self::Approve => DonationStatus::Approved,
            Self::Reject => DonationStatus::Rejected,
        }
    }
}

/// Donation as shown in lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonationView {
    /// Donation id
    pub id: i64,
    /// Campaign donated to
    pub campaign_id: i64,
    /// Amount
    pub amount: Decimal,
    /// Approval state
    pub status: DonationStatus,
    /// Name shown publicly
    pub public_name: String,
    /// Group given on behalf of
    pub group_id: Option<i64>,
    /// Name of that group
    pub group_name: Option<String>,
    /// Submission time
    pub created_at: DateTime<Utc>,
}

/// The donation box of a campaign page, returned to incremental-update requests
#[derive(Debug, Clone, Serialize)]
pub struct DonationPanel {
    /// Campaign shown
    pub campaign_id: i64,
    /// Current aggregates
    pub totals: CampaignTotals,
    /// Most recent donations
    pub donations: Vec<DonationView>,
    /// True when the viewer may not donate here
    pub disable_donate: bool,
}

/// A campaign the donor has given to, with the donor's own total
#[derive(Debug, Clone, Serialize)]
pub struct DonatedCampaign {
    /// The campaign row
    #[serde(flatten)]
    pub campaign: campaign_entity::Model,
    /// Sum of the donor's donations to it
    pub total_donated: Decimal,
}

/// Name shown for a donation: "Anonymous", else the display name, else the username.
#[must_use]
pub fn public_name(donation: &donation::Model, username: &str) -> String {
    if donation.is_anonymous {
        ANONYMOUS.to_string()
    } else if !donation.display_name.is_empty() {
        donation.display_name.clone()
    } else {
        username.to_string()
    }
}

fn max_amount_minor() -> Result<i64> {
    money::to_minor_units(Precision::DONATION_AMOUNT.max_value(), Precision::DONATION_AMOUNT)
}

async fn to_views<C: ConnectionTrait>(conn: &C, rows: Vec<donation::Model>) -> Result<Vec<DonationView>> {
    let mut donor_ids: Vec<i64> = rows.iter().map(|d| d.donor_id).collect();
    donor_ids.sort_unstable();
    donor_ids.dedup();
    let mut group_ids: Vec<i64> = rows.iter().filter_map(|d| d.group_id).collect();
    group_ids.sort_unstable();
    group_ids.dedup();

    let usernames: HashMap<i64, String> = if donor_ids.is_empty() {
        HashMap::new()
    } else {
        User::find()
            .filter(user::Column::Id.is_in(donor_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect()
    };
    let group_names: HashMap<i64, String> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        DonorGroup::find()
            .filter(donor_group::Column::Id.is_in(group_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|d| {
            let username = usernames.get(&d.donor_id).map_or("", String::as_str);
            DonationView {
                id: d.id,
                campaign_id: d.campaign_id,
                amount: d.amount(),
                status: d.status,
                public_name: public_name(&d, username),
                group_id: d.group_id,
                group_name: d.group_id.and_then(|id| group_names.get(&id).cloned()),
                created_at: d.created_at,
            }
        })
        .collect())
}

/// Submits a pending donation and notifies the campaign owner.
///
/// # Arguments
/// * `db` - Database connection
/// * `donor` - Acting user, must have the donor role
/// * `campaign_id` - Campaign to support
/// * `input` - Donation form
///
/// # Errors
/// * `Forbidden` - Actor is a fundraiser, owns the campaign, or is not in the given group
/// * `InvalidAmount` / `AmountTooLarge` - Amount outside `(0, max]` after rounding
/// * `NotFound` - Campaign or group does not exist
pub async fn submit_donation(
    db: &DatabaseConnection,
    donor: &user::Model,
    campaign_id: i64,
    input: DonationInput,
) -> Result<donation::Model> {
    let campaign = campaign::get_campaign(db, campaign_id).await?;

    if !donor.is_donor() {
        warn!("Fundraiser {} tried to donate to campaign {}", donor.id, campaign.id);
        return Err(Error::forbidden(
            "Accounts with the fundraiser role cannot donate.",
        ));
    }
    if campaign.owner_id == donor.id {
        return Err(Error::forbidden("You cannot donate to your own campaign."));
    }

    let amount = money::parse_amount(&input.amount, Precision::DONATION_AMOUNT, AMOUNT_FIELD)?;

    if let Some(group_id) = input.group_id {
        group::get_group(db, group_id).await?;
        if !group::is_member(db, group_id, donor.id).await? {
            warn!("User {} donated on behalf of group {} without membership", donor.id, group_id);
            return Err(Error::forbidden("You are not a member of that donor group."));
        }
    }

    let txn = db.begin().await?;

    let created = donation::ActiveModel {
        campaign_id: Set(campaign.id),
        donor_id: Set(donor.id),
        group_id: Set(input.group_id),
        amount_minor: Set(money::to_minor_units(amount, Precision::DONATION_AMOUNT)?),
        status: Set(DonationStatus::Pending),
        decided_by: Set(None),
        decided_at: Set(None),
        is_anonymous: Set(input.is_anonymous),
        display_name: Set(input.display_name.trim().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    notification::notify(
        &txn,
        &Notice::Donation {
            owner_id: campaign.owner_id,
            campaign_id: campaign.id,
            campaign_title: campaign.title.clone(),
        },
    )
    .await?;

    txn.commit().await?;

    info!(
        "User {} donated {} to campaign {} (donation {})",
        donor.id, amount, campaign.id, created.id
    );
    Ok(created)
}

/// Approves or rejects a pending donation. Campaign owner only.
///
/// # Errors
/// * `Forbidden` - Actor does not own the campaign
/// * `AlreadyDecided` - The donation is no longer pending
pub async fn decide_donation(
    db: &DatabaseConnection,
    actor_id: i64,
    donation_id: i64,
    decision: Decision,
) -> Result<donation::Model> {
    let existing = Donation::find_by_id(donation_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Donation", donation_id))?;
    let campaign = campaign::get_campaign(db, existing.campaign_id).await?;
    if campaign.owner_id != actor_id {
        warn!(
            "User {} tried to decide donation {} on campaign {}",
            actor_id, donation_id, campaign.id
        );
        return Err(Error::forbidden(
            "Only the campaign owner can approve or reject donations.",
        ));
    }

    let result = Donation::update_many()
        .set(donation::ActiveModel {
            status: Set(decision.status()),
            decided_by: Set(Some(actor_id)),
            decided_at: Set(Some(Utc::now())),
            ..Default::default()
        })
        .filter(donation::Column::Id.eq(donation_id))
        .filter(donation::Column::Status.eq(DonationStatus::Pending))
        .exec(db)
        .await?;

    let current = Donation::find_by_id(donation_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Donation", donation_id))?;

    if result.rows_affected == 0 {
        return Err(Error::AlreadyDecided {
            id: donation_id,
            status: current.status.as_str().to_string(),
        });
    }

    info!(
        "User {} {} donation {} on campaign {}",
        actor_id,
        current.status.as_str(),
        donation_id,
        campaign.id
    );
    Ok(current)
}

/// Most recent donations of a campaign, any status, amounts above the column
/// maximum left out.
pub async fn recent_donations<C: ConnectionTrait>(
    conn: &C,
    campaign_id: i64,
    limit: u64,
) -> Result<Vec<DonationView>> {
    let rows = Donation::find()
        .filter(donation::Column::CampaignId.eq(campaign_id))
        .filter(donation::Column::AmountMinor.lte(max_amount_minor()?))
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id)
        .limit(limit)
        .all(conn)
        .await?;
    to_views(conn, rows).await
}

/// Pending donations of a campaign, oldest first. Campaign owner only.
pub async fn pending_donations(
    db: &DatabaseConnection,
    actor_id: i64,
    campaign_id: i64,
) -> Result<Vec<DonationView>> {
    let campaign = campaign::get_campaign(db, campaign_id).await?;
    if campaign.owner_id != actor_id {
        return Err(Error::forbidden(
            "Only the campaign owner can review pending donations.",
        ));
    }
    let rows = Donation::find()
        .filter(donation::Column::CampaignId.eq(campaign.id))
        .filter(donation::Column::Status.eq(DonationStatus::Pending))
        .order_by_asc(donation::Column::CreatedAt)
        .order_by_asc(donation::Column::Id)
        .all(db)
        .await?;
    to_views(db, rows).await
}

/// Campaigns the donor has given to, newest campaign first, with the donor's own total.
pub async fn donated_campaigns(
    db: &DatabaseConnection,
    donor_id: i64,
) -> Result<Vec<DonatedCampaign>> {
    let rows: Vec<(i64, i64)> = Donation::find()
        .select_only()
        .column(donation::Column::CampaignId)
        .column(donation::Column::AmountMinor)
        .filter(donation::Column::DonorId.eq(donor_id))
        .into_tuple()
        .all(db)
        .await?;

    let mut per_campaign: BTreeMap<i64, i128> = BTreeMap::new();
    for (campaign_id, amount_minor) in rows {
        *per_campaign.entry(campaign_id).or_default() += i128::from(amount_minor);
    }
    if per_campaign.is_empty() {
        return Ok(Vec::new());
    }

    let campaigns = Campaign::find()
        .filter(campaign_entity::Column::Id.is_in(per_campaign.keys().copied()))
        .order_by_desc(campaign_entity::Column::CreatedAt)
        .order_by_desc(campaign_entity::Column::Id)
        .all(db)
        .await?;

    Ok(campaigns
        .into_iter()
        .map(|c| {
            let minor = per_campaign.get(&c.id).copied().unwrap_or_default();
            DonatedCampaign {
                total_donated: Decimal::try_from_i128_with_scale(
                    minor,
                    Precision::DONATION_AMOUNT.fractional_digits,
                )
                .unwrap_or(Decimal::MAX),
                campaign: c,
            }
        })
        .collect())
}

/// Most recent donations made on behalf of a group, amounts above the column
/// maximum left out.
pub async fn group_donations<C: ConnectionTrait>(
    conn: &C,
    group_id: i64,
    limit: u64,
) -> Result<Vec<DonationView>> {
    let rows = Donation::find()
        .filter(donation::Column::GroupId.eq(group_id))
        .filter(donation::Column::AmountMinor.lte(max_amount_minor()?))
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id)
        .limit(limit)
        .all(conn)
        .await?;
    to_views(conn, rows).await
}

/// Builds the donation box for a campaign as seen by `viewer_id`.
pub async fn donation_panel(
    db: &DatabaseConnection,
    campaign_id: i64,
    viewer_id: i64,
    limit: u64,
) -> Result<DonationPanel> {
    let campaign = campaign::get_campaign(db, campaign_id).await?;
    Ok(DonationPanel {
        campaign_id: campaign.id,
        totals: campaign::campaign_totals(db, &campaign).await?,
        donations: recent_donations(db, campaign.id, limit).await?,
        disable_donate: campaign.owner_id == viewer_id,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::notification::unread_notification_count;
    use crate::test_utils::*;

    fn input(amount: &str) -> DonationInput {
        DonationInput {
            amount: amount.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_rounds_and_notifies_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, donor, campaign) = setup_with_campaign(&db).await?;

        let created = submit_donation(&db, &donor, campaign.id, input("50.004")).await?;
        assert_eq!(created.amount().to_string(), "50.00");
        assert_eq!(created.status, DonationStatus::Pending);
        assert_eq!(unread_notification_count(&db, owner.id).await?, 1);

        // Pending donations do not count yet
        let totals = campaign::campaign_totals(&db, &campaign).await?;
        assert_eq!(totals.total_raised, Decimal::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_rejections() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, donor, campaign) = setup_with_campaign(&db).await?;
        let other_fundraiser = create_test_fundraiser(&db, "other_fundraiser").await?;

        let err = submit_donation(&db, &donor, campaign.id, input("-5"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Donation amount must be greater than 0.");

        let err = submit_donation(&db, &other_fundraiser, campaign.id, input("5"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));
        assert!(err.to_string().contains("fundraiser"));

        let err = submit_donation(&db, &owner, campaign.id, input("5"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        let err = submit_donation(&db, &donor, 9999, input("5")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        // Nothing was stored and nobody was notified
        assert!(recent_donations(&db, campaign.id, 10).await?.is_empty());
        assert_eq!(unread_notification_count(&db, owner.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_with_group_requires_membership() -> Result<()> {
        let db = setup_test_db().await?;
        let (_owner, donor, campaign) = setup_with_campaign(&db).await?;
        let (_admin, group_row) = setup_with_group(&db).await?;

        let err = submit_donation(
            &db,
            &donor,
            campaign.id,
            DonationInput {
                amount: "5".to_string(),
                group_id: Some(group_row.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        group::join_by_code(&db, &donor, &group_row.join_code).await?;
        let created = submit_donation(
            &db,
            &donor,
            campaign.id,
            DonationInput {
                amount: "5".to_string(),
                group_id: Some(group_row.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(created.group_id, Some(group_row.id));

        let listed = group_donations(&db, group_row.id, 20).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].group_name.as_deref(), Some(group_row.name.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_counts_toward_totals() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, donor, campaign) = setup_with_campaign(&db).await?;

        let created = submit_donation(&db, &donor, campaign.id, input("50.004")).await?;
        let decided = decide_donation(&db, owner.id, created.id, Decision::Approve).await?;
        assert_eq!(decided.status, DonationStatus::Approved);
        assert_eq!(decided.decided_by, Some(owner.id));
        assert!(decided.decided_at.is_some());

        let totals = campaign::campaign_totals(&db, &campaign).await?;
        assert_eq!(totals.total_raised.to_string(), "50.00");
        assert_eq!(totals.donor_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_decide_only_once_and_only_by_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, donor, campaign) = setup_with_campaign(&db).await?;
        let created = submit_donation(&db, &donor, campaign.id, input("10")).await?;

        let err = decide_donation(&db, donor.id, created.id, Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        decide_donation(&db, owner.id, created.id, Decision::Reject).await?;
        let err = decide_donation(&db, owner.id, created.id, Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AlreadyDecided { ref status, .. } if status == "rejected"
        ));

        let totals = campaign::campaign_totals(&db, &campaign).await?;
        assert_eq!(totals.total_raised, Decimal::ZERO);

        assert!(matches!(
            decide_donation(&db, owner.id, 9999, Decision::Approve).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_public_names_and_lists() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, donor, campaign) = setup_with_campaign(&db).await?;

        submit_donation(&db, &donor, campaign.id, input("1")).await?;
        submit_donation(
            &db,
            &donor,
            campaign.id,
            DonationInput {
                amount: "2".to_string(),
                display_name: "Friend of the park".to_string(),
                ..Default::default()
            },
        )
        .await?;
        submit_donation(
            &db,
            &donor,
            campaign.id,
            DonationInput {
                amount: "3".to_string(),
                is_anonymous: true,
                display_name: "ignored".to_string(),
                ..Default::default()
            },
        )
        .await?;

        let recent = recent_donations(&db, campaign.id, 2).await?;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].public_name, "Anonymous");
        assert_eq!(recent[1].public_name, "Friend of the park");

        let pending = pending_donations(&db, owner.id, campaign.id).await?;
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].public_name, donor.username);
        assert!(matches!(
            pending_donations(&db, donor.id, campaign.id).await,
            Err(Error::Forbidden { .. })
        ));

        let mine = donated_campaigns(&db, donor.id).await?;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].total_donated, Decimal::new(600, 2));

        let panel = donation_panel(&db, campaign.id, owner.id, 10).await?;
        assert!(panel.disable_donate);
        assert_eq!(panel.donations.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_group_donations_skip_oversized_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let (_owner, _donor, campaign) = setup_with_campaign(&db).await?;
        let (admin, group_row) = setup_with_group(&db).await?;

        let on_behalf = |amount: &str| DonationInput {
            amount: amount.to_string(),
            group_id: Some(group_row.id),
            ..Default::default()
        };
        let kept = submit_donation(&db, &admin, campaign.id, on_behalf("12")).await?;
        let oversized = submit_donation(&db, &admin, campaign.id, on_behalf("1")).await?;

        let mut active: donation::ActiveModel = oversized.into();
        active.amount_minor = Set(1_000_000_000_000_000_000);
        active.update(&db).await?;

        let listed = group_donations(&db, group_row.id, 20).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);
        assert_eq!(listed[0].group_name.as_deref(), Some(group_row.name.as_str()));
        Ok(())
    }
}

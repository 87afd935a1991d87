//! Campaign business logic - Creation, catalog queries, owner edits, updates and events.
//!
//! Only fundraisers create campaigns, and only a campaign's owner edits it, posts
//! updates or schedules events. Totals count approved donations only.

use crate::{
    core::{
        donation::{self, DonationView},
        money::{self, Precision},
    },
    entities::{
        Campaign, CampaignCategory, CampaignTag, CampaignUpdate, Category, Donation,
        DonationStatus, Event, Tag, campaign, campaign_category, campaign_tag, campaign_update,
        category, donation as donation_entity, event, tag, user,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    Condition, ConnectionTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

const GOAL_FIELD: &str = "Goal amount";
const CALENDAR_BASE_URL: &str = "https://calendar.google.com/calendar/render";

/// Campaign creation form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCampaign {
    /// Headline
    pub title: String,
    /// Long description
    pub description: String,
    /// Goal as a decimal string
    pub goal_amount: String,
    /// Last day, `YYYY-MM-DD`
    pub end_date: String,
    /// Optional cover image
    #[serde(default)]
    pub image_url: String,
    /// Optional QR image for direct transfers
    #[serde(default)]
    pub donate_qr_image_url: String,
    /// Existing categories to attach
    #[serde(default)]
    pub category_ids: Vec<i64>,
    /// Comma-separated category names, created when missing
    #[serde(default)]
    pub categories_text: String,
    /// Comma-separated tag names, created when missing
    #[serde(default)]
    pub tags: String,
}

/// Catalog ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CampaignSort {
    /// Most recently created first
    #[default]
    Newest,
    /// Highest approved total first, then most donors
    Popular,
    /// Soonest end date first
    Urgent,
}

impl From<&str> for CampaignSort {
    fn from(value: &str) -> Self {
        match value.trim() {
            "popular" => Self::Popular,
            "urgent" => Self::Urgent,
            _ => Self::Newest,
        }
    }
}

/// Catalog search parameters. Empty strings are ignored.
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    /// Substring of title or description
    pub q: String,
    /// Exact category slug
    pub category_slug: String,
    /// Substring of a tag name
    pub tag: String,
    /// Ordering
    pub sort: CampaignSort,
}

/// Aggregates over a campaign's approved donations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CampaignTotals {
    /// Sum of approved amounts
    pub total_raised: Decimal,
    /// Distinct donors among approved donations
    pub donor_count: u64,
    /// Floored share of the goal, 0..=100
    pub progress_percent: u8,
}

/// Catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct CampaignCard {
    /// The campaign row
    #[serde(flatten)]
    pub campaign: campaign::Model,
    /// Goal as a decimal
    pub goal_amount: Decimal,
    /// Aggregates
    pub totals: CampaignTotals,
    /// Still accepting support
    pub is_active: bool,
}

/// Everything the campaign page shows
#[derive(Debug, Clone, Serialize)]
pub struct CampaignDetail {
    /// Summary with totals
    #[serde(flatten)]
    pub card: CampaignCard,
    /// Attached categories
    pub categories: Vec<category::Model>,
    /// Attached tags
    pub tags: Vec<tag::Model>,
    /// Most recent donations
    pub donations: Vec<DonationView>,
    /// Owner posts, newest first
    pub updates: Vec<campaign_update::Model>,
    /// Scheduled events, soonest first
    pub events: Vec<event::Model>,
    /// Whether the viewer owns the campaign
    pub can_manage: bool,
}

/// Owner progress post input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUpdate {
    /// Headline
    pub title: String,
    /// Markdown body
    pub content_md: String,
    /// Optional illustration
    #[serde(default)]
    pub image_url: String,
}

/// Event scheduling input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEvent {
    /// Event name
    pub title: String,
    /// Optional details
    #[serde(default)]
    pub description: String,
    /// RFC 3339 or ISO 8601 date-time; naive values are taken as UTC
    pub starts_at: String,
    /// Optional venue
    #[serde(default)]
    pub location: String,
}

/// Event with an add-to-calendar link
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    /// The event row
    #[serde(flatten)]
    pub event: event::Model,
    /// Google Calendar template link spanning one hour
    pub calendar_url: String,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// A campaign stays active through its end date.
#[must_use]
pub fn is_active(campaign: &campaign::Model, today: NaiveDate) -> bool {
    campaign.is_active(today)
}

/// Splits a comma-separated list, trimming entries and dropping case-insensitive
/// duplicates while keeping the first spelling.
#[must_use]
pub fn parse_labels(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .filter(|label| seen.insert(label.to_lowercase()))
        .map(ToString::to_string)
        .collect()
}

/// URL-safe lower-case form of a name.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        }
    }
    slug
}

fn slug_candidate(base: &str, attempt: usize) -> String {
    match (base.is_empty(), attempt) {
        (true, n) => format!("label-{}", n + 1),
        (false, 0) => base.to_string(),
        (false, n) => format!("{base}-{}", n + 1),
    }
}

async fn get_or_create_category<C: ConnectionTrait>(conn: &C, name: &str) -> Result<category::Model> {
    if let Some(existing) = Category::find()
        .filter(category::Column::Name.eq(name))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let base = slugify(name);
    let mut attempt = 0;
    let slug = loop {
        let candidate = slug_candidate(&base, attempt);
        let taken = Category::find()
            .filter(category::Column::Slug.eq(candidate.as_str()))
            .one(conn)
            .await?
            .is_some();
        if !taken {
            break candidate;
        }
        attempt += 1;
    };

    let created = category::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(created)
}

async fn get_or_create_tag<C: ConnectionTrait>(conn: &C, name: &str) -> Result<tag::Model> {
    if let Some(existing) = Tag::find().filter(tag::Column::Name.eq(name)).one(conn).await? {
        return Ok(existing);
    }

    let base = slugify(name);
    let mut attempt = 0;
    let slug = loop {
        let candidate = slug_candidate(&base, attempt);
        let taken = Tag::find()
            .filter(tag::Column::Slug.eq(candidate.as_str()))
            .one(conn)
            .await?
            .is_some();
        if !taken {
            break candidate;
        }
        attempt += 1;
    };

    let created = tag::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(created)
}

fn parse_end_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| Error::validation("Please provide a valid end date."))
}

fn parse_starts_at(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::validation("Please provide a valid start time."))
}

fn ensure_owner(campaign: &campaign::Model, actor_id: i64, action: &str) -> Result<()> {
    if campaign.owner_id == actor_id {
        Ok(())
    } else {
        warn!(
            "User {} tried to {} campaign {} owned by {}",
            actor_id, action, campaign.id, campaign.owner_id
        );
        Err(Error::forbidden(format!("You cannot {action} this campaign.")))
    }
}

/// Creates a campaign for a fundraiser.
///
/// # Arguments
/// * `db` - Database connection
/// * `owner` - Acting user, must be a fundraiser
/// * `input` - Creation form
///
/// # Errors
/// `Forbidden` for non-fundraisers; validation errors for missing fields, a bad
/// goal amount or an end date in the past.
pub async fn create_campaign(
    db: &DatabaseConnection,
    owner: &user::Model,
    input: NewCampaign,
) -> Result<campaign::Model> {
    if !owner.can_fundraise() {
        warn!("User {} tried to create a campaign without fundraiser role", owner.id);
        return Err(Error::forbidden("Your account is not set as a fundraiser."));
    }

    let title = input.title.trim().to_string();
    let description = input.description.trim().to_string();
    if title.is_empty()
        || description.is_empty()
        || input.goal_amount.trim().is_empty()
        || input.end_date.trim().is_empty()
    {
        return Err(Error::validation("Please fill in all required fields."));
    }

    let goal = money::parse_amount(&input.goal_amount, Precision::CAMPAIGN_GOAL, GOAL_FIELD)?;
    let end_date = parse_end_date(&input.end_date)?;
    if end_date < today() {
        return Err(Error::validation("End date must be today or later."));
    }

    let txn = db.begin().await?;

    let created = campaign::ActiveModel {
        owner_id: Set(owner.id),
        title: Set(title),
        description: Set(description),
        image_url: Set(input.image_url.trim().to_string()),
        donate_qr_image_url: Set(input.donate_qr_image_url.trim().to_string()),
        goal_amount_minor: Set(money::to_minor_units(goal, Precision::CAMPAIGN_GOAL)?),
        end_date: Set(end_date),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut category_ids: BTreeSet<i64> = if input.category_ids.is_empty() {
        BTreeSet::new()
    } else {
        Category::find()
            .filter(category::Column::Id.is_in(input.category_ids))
            .all(&txn)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect()
    };
    for name in parse_labels(&input.categories_text) {
        category_ids.insert(get_or_create_category(&txn, &name).await?.id);
    }
    for category_id in category_ids {
        campaign_category::ActiveModel {
            campaign_id: Set(created.id),
            category_id: Set(category_id),
        }
        .insert(&txn)
        .await?;
    }

    let mut tag_ids = BTreeSet::new();
    for name in parse_labels(&input.tags) {
        tag_ids.insert(get_or_create_tag(&txn, &name).await?.id);
    }
    for tag_id in tag_ids {
        campaign_tag::ActiveModel {
            campaign_id: Set(created.id),
            tag_id: Set(tag_id),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(
        "User {} created campaign {} '{}' with goal {}",
        owner.id, created.id, created.title, goal
    );
    Ok(created)
}

/// Loads a campaign, failing with `NotFound` when missing.
pub async fn get_campaign<C: ConnectionTrait>(conn: &C, campaign_id: i64) -> Result<campaign::Model> {
    Campaign::find_by_id(campaign_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Campaign", campaign_id))
}

/// Approved totals for many campaigns at once, keyed by campaign id.
///
/// Amounts above the donation column maximum are ignored.
pub async fn totals_for<C: ConnectionTrait>(
    conn: &C,
    campaigns: &[campaign::Model],
) -> Result<HashMap<i64, CampaignTotals>> {
    let ids: Vec<i64> = campaigns.iter().map(|c| c.id).collect();
    let max_minor =
        money::to_minor_units(Precision::DONATION_AMOUNT.max_value(), Precision::DONATION_AMOUNT)?;

    let rows: Vec<(i64, i64, i64)> = if ids.is_empty() {
        Vec::new()
    } else {
        Donation::find()
            .select_only()
            .column(donation_entity::Column::CampaignId)
            .column(donation_entity::Column::DonorId)
            .column(donation_entity::Column::AmountMinor)
            .filter(donation_entity::Column::CampaignId.is_in(ids))
            .filter(donation_entity::Column::Status.eq(DonationStatus::Approved))
            .filter(donation_entity::Column::AmountMinor.lte(max_minor))
            .into_tuple()
            .all(conn)
            .await?
    };

    let mut sums: HashMap<i64, (i128, HashSet<i64>)> = HashMap::new();
    for (campaign_id, donor_id, amount_minor) in rows {
        let entry = sums.entry(campaign_id).or_default();
        entry.0 += i128::from(amount_minor);
        entry.1.insert(donor_id);
    }

    Ok(campaigns
        .iter()
        .map(|c| {
            let (minor_total, donors) = sums.remove(&c.id).unwrap_or_default();
            let total_raised = Decimal::try_from_i128_with_scale(
                minor_total,
                Precision::DONATION_AMOUNT.fractional_digits,
            )
            .unwrap_or(Decimal::MAX);
            let totals = CampaignTotals {
                total_raised,
                donor_count: donors.len() as u64,
                progress_percent: money::progress_percent(total_raised, c.goal_amount()),
            };
            (c.id, totals)
        })
        .collect())
}

/// Approved total, distinct donors and progress of one campaign.
pub async fn campaign_totals<C: ConnectionTrait>(
    conn: &C,
    campaign: &campaign::Model,
) -> Result<CampaignTotals> {
    let mut totals = totals_for(conn, std::slice::from_ref(campaign)).await?;
    Ok(totals.remove(&campaign.id).unwrap_or_default())
}

async fn campaign_ids_for_categories<C: ConnectionTrait>(
    conn: &C,
    category_ids: Vec<i64>,
) -> Result<Vec<i64>> {
    if category_ids.is_empty() {
        return Ok(Vec::new());
    }
    CampaignCategory::find()
        .select_only()
        .column(campaign_category::Column::CampaignId)
        .filter(campaign_category::Column::CategoryId.is_in(category_ids))
        .into_tuple()
        .all(conn)
        .await
        .map_err(Into::into)
}

async fn campaign_ids_for_tags<C: ConnectionTrait>(conn: &C, tag_ids: Vec<i64>) -> Result<Vec<i64>> {
    if tag_ids.is_empty() {
        return Ok(Vec::new());
    }
    CampaignTag::find()
        .select_only()
        .column(campaign_tag::Column::CampaignId)
        .filter(campaign_tag::Column::TagId.is_in(tag_ids))
        .into_tuple()
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Searches and orders the catalog.
pub async fn list_campaigns(
    db: &DatabaseConnection,
    filter: &CampaignFilter,
) -> Result<Vec<CampaignCard>> {
    let mut query = Campaign::find();

    let q = filter.q.trim();
    if !q.is_empty() {
        query = query.filter(
            Condition::any()
                .add(campaign::Column::Title.contains(q))
                .add(campaign::Column::Description.contains(q)),
        );
    }

    let category_slug = filter.category_slug.trim();
    if !category_slug.is_empty() {
        let category_ids: Vec<i64> = Category::find()
            .select_only()
            .column(category::Column::Id)
            .filter(category::Column::Slug.eq(category_slug))
            .into_tuple()
            .all(db)
            .await?;
        let ids = campaign_ids_for_categories(db, category_ids).await?;
        query = query.filter(campaign::Column::Id.is_in(ids));
    }

    let tag_q = filter.tag.trim();
    if !tag_q.is_empty() {
        let tag_ids: Vec<i64> = Tag::find()
            .select_only()
            .column(tag::Column::Id)
            .filter(tag::Column::Name.contains(tag_q))
            .into_tuple()
            .all(db)
            .await?;
        let ids = campaign_ids_for_tags(db, tag_ids).await?;
        query = query.filter(campaign::Column::Id.is_in(ids));
    }

    query = match filter.sort {
        CampaignSort::Urgent => query
            .order_by_asc(campaign::Column::EndDate)
            .order_by_asc(campaign::Column::Id),
        CampaignSort::Newest | CampaignSort::Popular => query
            .order_by_desc(campaign::Column::CreatedAt)
            .order_by_desc(campaign::Column::Id),
    };

    let campaigns = query.all(db).await?;
    let mut totals = totals_for(db, &campaigns).await?;
    let today = today();

    let mut cards: Vec<CampaignCard> = campaigns
        .into_iter()
        .map(|c| CampaignCard {
            goal_amount: c.goal_amount(),
            totals: totals.remove(&c.id).unwrap_or_default(),
            is_active: c.is_active(today),
            campaign: c,
        })
        .collect();

    if filter.sort == CampaignSort::Popular {
        // Stable, so ties stay newest first
        cards.sort_by(|a, b| {
            b.totals
                .total_raised
                .cmp(&a.totals.total_raised)
                .then(b.totals.donor_count.cmp(&a.totals.donor_count))
        });
    }
    Ok(cards)
}

/// Categories attached to a campaign, by name.
pub async fn categories_of<C: ConnectionTrait>(conn: &C, campaign_id: i64) -> Result<Vec<category::Model>> {
    let ids: Vec<i64> = CampaignCategory::find()
        .select_only()
        .column(campaign_category::Column::CategoryId)
        .filter(campaign_category::Column::CampaignId.eq(campaign_id))
        .into_tuple()
        .all(conn)
        .await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Category::find()
        .filter(category::Column::Id.is_in(ids))
        .order_by_asc(category::Column::Name)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Tags attached to a campaign, by name.
pub async fn tags_of<C: ConnectionTrait>(conn: &C, campaign_id: i64) -> Result<Vec<tag::Model>> {
    let ids: Vec<i64> = CampaignTag::find()
        .select_only()
        .column(campaign_tag::Column::TagId)
        .filter(campaign_tag::Column::CampaignId.eq(campaign_id))
        .into_tuple()
        .all(conn)
        .await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Tag::find()
        .filter(tag::Column::Id.is_in(ids))
        .order_by_asc(tag::Column::Name)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Builds the campaign page.
///
/// # Arguments
/// * `db` - Database connection
/// * `campaign_id` - Campaign to show
/// * `viewer_id` - Caller, if known, used for `can_manage`
/// * `donation_limit` - How many recent donations to include
pub async fn get_campaign_detail(
    db: &DatabaseConnection,
    campaign_id: i64,
    viewer_id: Option<i64>,
    donation_limit: u64,
) -> Result<CampaignDetail> {
    let campaign = get_campaign(db, campaign_id).await?;
    let totals = campaign_totals(db, &campaign).await?;
    let categories = categories_of(db, campaign.id).await?;
    let tags = tags_of(db, campaign.id).await?;
    let donations = donation::recent_donations(db, campaign.id, donation_limit).await?;
    let updates = CampaignUpdate::find()
        .filter(campaign_update::Column::CampaignId.eq(campaign.id))
        .order_by_desc(campaign_update::Column::CreatedAt)
        .order_by_desc(campaign_update::Column::Id)
        .all(db)
        .await?;
    let events = Event::find()
        .filter(event::Column::CampaignId.eq(campaign.id))
        .order_by_asc(event::Column::StartsAt)
        .all(db)
        .await?;

    Ok(CampaignDetail {
        can_manage: viewer_id == Some(campaign.owner_id),
        card: CampaignCard {
            goal_amount: campaign.goal_amount(),
            totals,
            is_active: campaign.is_active(today()),
            campaign,
        },
        categories,
        tags,
        donations,
        updates,
        events,
    })
}

/// Replaces the cover image. Owner only.
pub async fn set_image_url(
    db: &DatabaseConnection,
    actor_id: i64,
    campaign_id: i64,
    image_url: &str,
) -> Result<campaign::Model> {
    let existing = get_campaign(db, campaign_id).await?;
    ensure_owner(&existing, actor_id, "edit")?;

    let mut active: campaign::ActiveModel = existing.into();
    active.image_url = Set(image_url.trim().to_string());
    let updated = active.update(db).await?;
    info!("Campaign {} image updated", updated.id);
    Ok(updated)
}

/// Replaces the donation QR image. Owner only.
pub async fn set_donate_qr_image_url(
    db: &DatabaseConnection,
    actor_id: i64,
    campaign_id: i64,
    donate_qr_image_url: &str,
) -> Result<campaign::Model> {
    let existing = get_campaign(db, campaign_id).await?;
    ensure_owner(&existing, actor_id, "edit")?;

    let mut active: campaign::ActiveModel = existing.into();
    active.donate_qr_image_url = Set(donate_qr_image_url.trim().to_string());
    let updated = active.update(db).await?;
    info!("Campaign {} donate QR updated", updated.id);
    Ok(updated)
}

/// Posts a progress update. Owner only; title and content are required.
pub async fn add_update(
    db: &DatabaseConnection,
    actor_id: i64,
    campaign_id: i64,
    input: NewUpdate,
) -> Result<campaign_update::Model> {
    let campaign = get_campaign(db, campaign_id).await?;
    ensure_owner(&campaign, actor_id, "update")?;

    let title = input.title.trim().to_string();
    let content_md = input.content_md.trim().to_string();
    if title.is_empty() || content_md.is_empty() {
        return Err(Error::validation("Title and content are required."));
    }

    let created = campaign_update::ActiveModel {
        campaign_id: Set(campaign.id),
        title: Set(title),
        content_md: Set(content_md),
        image_url: Set(input.image_url.trim().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Campaign {} posted update {}", campaign.id, created.id);
    Ok(created)
}

/// Loads an update that belongs to the given campaign.
pub async fn get_update(
    db: &DatabaseConnection,
    campaign_id: i64,
    update_id: i64,
) -> Result<campaign_update::Model> {
    let campaign = get_campaign(db, campaign_id).await?;
    CampaignUpdate::find_by_id(update_id)
        .filter(campaign_update::Column::CampaignId.eq(campaign.id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Campaign update", update_id))
}

/// Schedules an event. Owner only; title and start time are required.
pub async fn create_event(
    db: &DatabaseConnection,
    actor_id: i64,
    campaign_id: i64,
    input: NewEvent,
) -> Result<event::Model> {
    let campaign = get_campaign(db, campaign_id).await?;
    ensure_owner(&campaign, actor_id, "add an event to")?;

    let title = input.title.trim().to_string();
    if title.is_empty() || input.starts_at.trim().is_empty() {
        return Err(Error::validation("Title and start time are required."));
    }
    let starts_at = parse_starts_at(&input.starts_at)?;

    let created = event::ActiveModel {
        campaign_id: Set(campaign.id),
        title: Set(title),
        description: Set(input.description.trim().to_string()),
        starts_at: Set(starts_at),
        location: Set(input.location.trim().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Campaign {} scheduled event {} at {}", campaign.id, created.id, starts_at);
    Ok(created)
}

/// Google Calendar template link for a one-hour slot starting at the event.
#[must_use]
pub fn calendar_url(event: &event::Model) -> String {
    const STAMP: &str = "%Y%m%dT%H%M%SZ";
    let ends_at = event.starts_at + Duration::hours(1);
    let dates = format!(
        "{}/{}",
        event.starts_at.format(STAMP),
        ends_at.format(STAMP)
    );
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("action", "TEMPLATE")
        .append_pair("text", &event.title)
        .append_pair("dates", &dates)
        .append_pair("details", &event.description)
        .append_pair("location", &event.location)
        .finish();
    format!("{CALENDAR_BASE_URL}?{query}")
}

/// Loads an event of the given campaign together with its calendar link.
pub async fn get_event_detail(
    db: &DatabaseConnection,
    campaign_id: i64,
    event_id: i64,
) -> Result<EventDetail> {
    let campaign = get_campaign(db, campaign_id).await?;
    let event = Event::find_by_id(event_id)
        .filter(event::Column::CampaignId.eq(campaign.id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Event", event_id))?;
    Ok(EventDetail {
        calendar_url: calendar_url(&event),
        event,
    })
}

/// All categories ordered by name.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_labels_dedupes_case_insensitively() {
        assert_eq!(
            parse_labels(" Water, health ,water,, HEALTH ,Kids"),
            vec!["Water", "health", "Kids"]
        );
        assert!(parse_labels(" , ,").is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Clean Water  Access"), "clean-water-access");
        assert_eq!(slugify("  Kids & Schools! "), "kids-schools");
        assert_eq!(slugify("snake_case-name"), "snake_case-name");
    }

    #[test]
    fn test_sort_from_str() {
        assert_eq!(CampaignSort::from("popular"), CampaignSort::Popular);
        assert_eq!(CampaignSort::from("urgent"), CampaignSort::Urgent);
        assert_eq!(CampaignSort::from("whatever"), CampaignSort::Newest);
    }

    #[test]
    fn test_calendar_url() {
        let event = event::Model {
            id: 1,
            campaign_id: 1,
            title: "Charity Run".to_string(),
            description: "5k & fun".to_string(),
            starts_at: Utc.with_ymd_and_hms(2030, 5, 1, 9, 30, 0).unwrap(),
            location: "City Park".to_string(),
            created_at: Utc::now(),
        };
        let url = calendar_url(&event);
        assert!(url.starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE"));
        assert!(url.contains("text=Charity+Run"));
        assert!(url.contains("dates=20300501T093000Z%2F20300501T103000Z"));
        assert!(url.contains("details=5k+%26+fun"));
        assert!(url.contains("location=City+Park"));
    }

    #[test]
    fn test_parse_starts_at_formats() {
        let expected = Utc.with_ymd_and_hms(2030, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_starts_at("2030-05-01T09:30").unwrap(), expected);
        assert_eq!(parse_starts_at("2030-05-01T09:30:00").unwrap(), expected);
        assert_eq!(parse_starts_at("2030-05-01T11:30:00+02:00").unwrap(), expected);
        assert!(parse_starts_at("next tuesday").is_err());
    }

    #[tokio::test]
    async fn test_create_campaign_with_labels() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_fundraiser(&db, "owner").await?;

        let created = create_campaign(
            &db,
            &owner,
            NewCampaign {
                title: "  Clean Water ".to_string(),
                description: "Wells for villages".to_string(),
                goal_amount: "1000.005".to_string(),
                end_date: "2099-12-31".to_string(),
                categories_text: "Health, health, Environment".to_string(),
                tags: "water, Wells, WATER".to_string(),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(created.title, "Clean Water");
        assert_eq!(created.goal_amount().to_string(), "1000.01");

        let categories = categories_of(&db, created.id).await?;
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Environment", "Health"]);
        assert_eq!(categories[1].slug, "health");

        let tags = tags_of(&db, created.id).await?;
        assert_eq!(tags.len(), 2);

        // Existing categories are linked by id, not duplicated
        let second = create_campaign(
            &db,
            &owner,
            NewCampaign {
                title: "Second".to_string(),
                description: "More".to_string(),
                goal_amount: "10".to_string(),
                end_date: "2099-12-31".to_string(),
                category_ids: vec![categories[0].id, 9999],
                categories_text: "Health".to_string(),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(categories_of(&db, second.id).await?.len(), 2);
        assert_eq!(list_categories(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_campaign_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_fundraiser(&db, "owner").await?;
        let donor = create_test_donor(&db, "donor").await?;

        let valid = NewCampaign {
            title: "Title".to_string(),
            description: "Desc".to_string(),
            goal_amount: "100".to_string(),
            end_date: "2099-01-01".to_string(),
            ..Default::default()
        };

        let err = create_campaign(&db, &donor, valid.clone()).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        let mut input = valid.clone();
        input.description = "  ".to_string();
        assert!(matches!(
            create_campaign(&db, &owner, input).await,
            Err(Error::Validation { .. })
        ));

        let mut input = valid.clone();
        input.goal_amount = "-1".to_string();
        assert!(matches!(
            create_campaign(&db, &owner, input).await,
            Err(Error::InvalidAmount { .. })
        ));

        let mut input = valid.clone();
        input.goal_amount = "99999999999999999".to_string();
        assert!(matches!(
            create_campaign(&db, &owner, input).await,
            Err(Error::AmountTooLarge { .. })
        ));

        let mut input = valid.clone();
        input.end_date = "2000-01-01".to_string();
        let err = create_campaign(&db, &owner, input).await.unwrap_err();
        assert_eq!(err.to_string(), "End date must be today or later.");

        let mut input = valid;
        input.end_date = "31/12/2099".to_string();
        assert!(matches!(
            create_campaign(&db, &owner, input).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_campaigns_filters_and_sorts() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_fundraiser(&db, "owner").await?;
        let donor = create_test_donor(&db, "donor").await?;

        let water = create_campaign(
            &db,
            &owner,
            NewCampaign {
                title: "Clean water".to_string(),
                description: "Wells".to_string(),
                goal_amount: "100".to_string(),
                end_date: "2099-06-01".to_string(),
                categories_text: "Health".to_string(),
                tags: "wells".to_string(),
                ..Default::default()
            },
        )
        .await?;
        let school = create_campaign(
            &db,
            &owner,
            NewCampaign {
                title: "School books".to_string(),
                description: "Reading for kids".to_string(),
                goal_amount: "100".to_string(),
                end_date: "2098-01-01".to_string(),
                tags: "education".to_string(),
                ..Default::default()
            },
        )
        .await?;

        let newest = list_campaigns(&db, &CampaignFilter::default()).await?;
        assert_eq!(newest[0].campaign.id, school.id);

        let by_text = list_campaigns(
            &db,
            &CampaignFilter {
                q: "WELLS".to_string(),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].campaign.id, water.id);

        let by_category = list_campaigns(
            &db,
            &CampaignFilter {
                category_slug: "health".to_string(),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_category.len(), 1);

        let by_tag = list_campaigns(
            &db,
            &CampaignFilter {
                tag: "educ".to_string(),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].campaign.id, school.id);

        let urgent = list_campaigns(
            &db,
            &CampaignFilter {
                sort: CampaignSort::Urgent,
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(urgent[0].campaign.id, school.id);

        let donation = create_test_donation(&db, &donor, water.id, "40").await?;
        donation::decide_donation(&db, owner.id, donation.id, donation::Decision::Approve).await?;

        let popular = list_campaigns(
            &db,
            &CampaignFilter {
                sort: CampaignSort::Popular,
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(popular[0].campaign.id, water.id);
        assert_eq!(popular[0].totals.progress_percent, 40);
        Ok(())
    }

    #[tokio::test]
    async fn test_totals_count_only_approved() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, donor, campaign) = setup_with_campaign(&db).await?;
        let other = create_test_donor(&db, "other").await?;

        let first = create_test_donation(&db, &donor, campaign.id, "30").await?;
        let second = create_test_donation(&db, &donor, campaign.id, "20").await?;
        let rejected = create_test_donation(&db, &other, campaign.id, "500").await?;
        create_test_donation(&db, &other, campaign.id, "7").await?;

        donation::decide_donation(&db, owner.id, first.id, donation::Decision::Approve).await?;
        donation::decide_donation(&db, owner.id, second.id, donation::Decision::Approve).await?;
        donation::decide_donation(&db, owner.id, rejected.id, donation::Decision::Reject).await?;

        let totals = campaign_totals(&db, &campaign).await?;
        assert_eq!(totals.total_raised, Decimal::new(5000, 2));
        assert_eq!(totals.donor_count, 1);
        assert_eq!(totals.progress_percent, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_totals_skip_amounts_above_column_maximum() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, donor, campaign) = setup_with_campaign(&db).await?;
        let other = create_test_donor(&db, "other").await?;

        let normal = create_test_donation(&db, &donor, campaign.id, "50").await?;
        let oversized = create_test_donation(&db, &other, campaign.id, "1").await?;
        donation::decide_donation(&db, owner.id, normal.id, donation::Decision::Approve).await?;
        donation::decide_donation(&db, owner.id, oversized.id, donation::Decision::Approve).await?;

        // Written around the validation path, past 9999999999999999.99
        let mut active: donation_entity::ActiveModel = oversized.into();
        active.amount_minor = Set(1_000_000_000_000_000_000);
        active.update(&db).await?;

        let totals = campaign_totals(&db, &campaign).await?;
        assert_eq!(totals.total_raised, Decimal::new(5000, 2));
        assert_eq!(totals.donor_count, 1);
        assert_eq!(totals.progress_percent, 5);

        let recent = donation::recent_donations(&db, campaign.id, 10).await?;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, normal.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_owner_only_edits() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, donor, campaign) = setup_with_campaign(&db).await?;

        let updated = set_image_url(&db, owner.id, campaign.id, " https://img/x.png ").await?;
        assert_eq!(updated.image_url, "https://img/x.png");
        let updated = set_donate_qr_image_url(&db, owner.id, campaign.id, "https://qr").await?;
        assert_eq!(updated.donate_qr_image_url, "https://qr");

        assert!(matches!(
            set_image_url(&db, donor.id, campaign.id, "x").await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            add_update(
                &db,
                donor.id,
                campaign.id,
                NewUpdate {
                    title: "t".to_string(),
                    content_md: "c".to_string(),
                    ..Default::default()
                }
            )
            .await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            set_image_url(&db, owner.id, 9999, "x").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_updates_and_events() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, _donor, campaign) = setup_with_campaign(&db).await?;

        let missing_content = add_update(
            &db,
            owner.id,
            campaign.id,
            NewUpdate {
                title: "Week 1".to_string(),
                content_md: " ".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(missing_content, Err(Error::Validation { .. })));

        let update = add_update(
            &db,
            owner.id,
            campaign.id,
            NewUpdate {
                title: "Week 1".to_string(),
                content_md: "**Great** start".to_string(),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(get_update(&db, campaign.id, update.id).await?.id, update.id);

        let other = create_test_campaign(&db, &owner, "Other").await?;
        assert!(matches!(
            get_update(&db, other.id, update.id).await,
            Err(Error::NotFound { .. })
        ));

        let no_start = create_event(
            &db,
            owner.id,
            campaign.id,
            NewEvent {
                title: "Gala".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(no_start, Err(Error::Validation { .. })));

        let event = create_event(
            &db,
            owner.id,
            campaign.id,
            NewEvent {
                title: "Gala".to_string(),
                starts_at: "2030-01-02T18:00".to_string(),
                location: "Hall".to_string(),
                ..Default::default()
            },
        )
        .await?;
        let detail = get_event_detail(&db, campaign.id, event.id).await?;
        assert!(detail.calendar_url.contains("dates=20300102T180000Z%2F20300102T190000Z"));
        assert!(matches!(
            get_event_detail(&db, other.id, event.id).await,
            Err(Error::NotFound { .. })
        ));

        let page = get_campaign_detail(&db, campaign.id, Some(owner.id), 10).await?;
        assert!(page.can_manage);
        assert!(page.card.is_active);
        assert_eq!(page.updates.len(), 1);
        assert_eq!(page.events.len(), 1);

        let page = get_campaign_detail(&db, campaign.id, None, 10).await?;
        assert!(!page.can_manage);
        Ok(())
    }
}

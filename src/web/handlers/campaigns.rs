use crate::{
    core::campaign::{
        self, CampaignCard, CampaignDetail, CampaignFilter, CampaignSort, EventDetail, NewCampaign,
        NewEvent, NewUpdate,
    },
    entities::{campaign as campaign_entity, campaign_update, category, event},
    errors::Result,
    web::{
        AppState,
        extractors::{CurrentUser, MaybeUser},
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

/// Catalog query string: `?q=&category=&tag=&sort=newest|popular|urgent`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    q: String,
    category: String,
    tag: String,
    sort: String,
}

impl From<ListParams> for CampaignFilter {
    fn from(params: ListParams) -> Self {
        Self {
            sort: CampaignSort::from(params.sort.as_str()),
            q: params.q,
            category_slug: params.category,
            tag: params.tag,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageBody {
    image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct DonateQrBody {
    donate_qr_image_url: String,
}

pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<category::Model>>> {
    Ok(Json(campaign::list_categories(&state.db).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<CampaignCard>>> {
    let filter = CampaignFilter::from(params);
    Ok(Json(campaign::list_campaigns(&state.db, &filter).await?))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(input): Json<NewCampaign>,
) -> Result<(StatusCode, Json<campaign_entity::Model>)> {
    let created = campaign::create_campaign(&state.db, &account, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<CampaignDetail>> {
    let viewer_id = viewer.map(|u| u.id);
    let limit = state.config.pages.donations;
    Ok(Json(
        campaign::get_campaign_detail(&state.db, id, viewer_id, limit).await?,
    ))
}

pub async fn set_image(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<ImageBody>,
) -> Result<Json<campaign_entity::Model>> {
    Ok(Json(
        campaign::set_image_url(&state.db, account.id, id, &body.image_url).await?,
    ))
}

pub async fn set_donate_qr(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<DonateQrBody>,
) -> Result<Json<campaign_entity::Model>> {
    Ok(Json(
        campaign::set_donate_qr_image_url(&state.db, account.id, id, &body.donate_qr_image_url)
            .await?,
    ))
}

pub async fn add_update(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<NewUpdate>,
) -> Result<(StatusCode, Json<campaign_update::Model>)> {
    let created = campaign::add_update(&state.db, account.id, id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_detail(
    State(state): State<AppState>,
    Path((id, update_id)): Path<(i64, i64)>,
) -> Result<Json<campaign_update::Model>> {
    Ok(Json(campaign::get_update(&state.db, id, update_id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<NewEvent>,
) -> Result<(StatusCode, Json<event::Model>)> {
    let created = campaign::create_event(&state.db, account.id, id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn event_detail(
    State(state): State<AppState>,
    Path((id, event_id)): Path<(i64, i64)>,
) -> Result<Json<EventDetail>> {
    Ok(Json(campaign::get_event_detail(&state.db, id, event_id).await?))
}

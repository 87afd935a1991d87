use crate::{
    core::donation::{self, DonatedCampaign, Decision, DonationInput, DonationView},
    entities::donation as donation_entity,
    errors::Result,
    web::{
        AppState,
        extractors::{CurrentUser, HxRequest},
    },
};
use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

/// Records a pending donation.
///
/// Partial-update requests get the refreshed donation panel back; plain form posts
/// are redirected to the campaign page.
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    HxRequest(is_hx): HxRequest,
    Path(id): Path<i64>,
    Json(input): Json<DonationInput>,
) -> Result<Response> {
    let created = donation::submit_donation(&state.db, &account, id, input).await?;
    debug!("Donation {} submitted (hx: {})", created.id, is_hx);

    if is_hx {
        let panel =
            donation::donation_panel(&state.db, id, account.id, state.config.pages.donations)
                .await?;
        return Ok(Json(panel).into_response());
    }
    Ok(Redirect::to(&format!("/campaigns/{id}/")).into_response())
}

pub async fn pending(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DonationView>>> {
    Ok(Json(
        donation::pending_donations(&state.db, account.id, id).await?,
    ))
}

pub async fn mine(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<Vec<DonatedCampaign>>> {
    Ok(Json(donation::donated_campaigns(&state.db, account.id).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<donation_entity::Model>> {
    decide(&state, account.id, id, Decision::Approve).await
}

pub async fn reject(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<donation_entity::Model>> {
    decide(&state, account.id, id, Decision::Reject).await
}

async fn decide(
    state: &AppState,
    actor_id: i64,
    donation_id: i64,
    decision: Decision,
) -> Result<Json<donation_entity::Model>> {
    Ok(Json(
        donation::decide_donation(&state.db, actor_id, donation_id, decision).await?,
    ))
}

use crate::{
    core::group::{self, GroupDetail, JoinOutcome, NewGroup},
    entities::donor_group,
    errors::Result,
    web::{AppState, extractors::CurrentUser},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct JoinBody {
    code: String,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    group: donor_group::Model,
    outcome: JoinOutcome,
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberBody {
    username: String,
}

#[derive(Debug, Serialize)]
pub struct AddMemberResponse {
    user_id: i64,
    username: String,
    outcome: JoinOutcome,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<donor_group::Model>>> {
    Ok(Json(group::list_groups(&state.db).await?))
}

pub async fn mine(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<Vec<donor_group::Model>>> {
    Ok(Json(group::list_groups_for_user(&state.db, account.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(input): Json<NewGroup>,
) -> Result<(StatusCode, Json<donor_group::Model>)> {
    let code_length = state.config.groups.join_code_length;
    let created = group::create_group(&state.db, &account, input, code_length).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn join(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(body): Json<JoinBody>,
) -> Result<Json<JoinResponse>> {
    let (joined, outcome) = group::join_by_code(&state.db, &account, &body.code).await?;
    let message = match outcome {
        JoinOutcome::Joined => format!("Successfully joined '{}'!", joined.name),
        JoinOutcome::AlreadyMember => format!("You are already a member of '{}'.", joined.name),
    };
    Ok(Json(JoinResponse {
        group: joined,
        outcome,
        message,
    }))
}

pub async fn detail(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<GroupDetail>> {
    let limit = state.config.pages.group_donations;
    Ok(Json(
        group::get_group_detail(&state.db, id, account.id, limit).await?,
    ))
}

pub async fn leave(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    group::leave_group(&state.db, account.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<AddMemberBody>,
) -> Result<Json<AddMemberResponse>> {
    let (member, outcome) = group::add_member(&state.db, account.id, id, &body.username).await?;
    Ok(Json(AddMemberResponse {
        user_id: member.id,
        username: member.username,
        outcome,
    }))
}

pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path((id, user_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    group::remove_member(&state.db, account.id, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

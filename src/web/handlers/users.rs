use crate::{
    core::user::{self as users, NewUser, ProfileUpdate},
    entities::user,
    errors::Result,
    web::{AppState, extractors::CurrentUser},
};
use axum::{Json, extract::State, http::StatusCode};

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<user::Model>)> {
    let created = users::register_user(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn me(CurrentUser(account): CurrentUser) -> Json<user::Model> {
    Json(account)
}

pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(changes): Json<ProfileUpdate>,
) -> Result<Json<user::Model>> {
    Ok(Json(users::update_profile(&state.db, account.id, changes).await?))
}

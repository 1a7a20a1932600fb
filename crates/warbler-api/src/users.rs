use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use warbler_store::{ProfileUpdate, StoreError, content, graph};
use warbler_types::api::{MessageResponse, UpdateProfileRequest, UserResponse};

use crate::AppState;
use crate::error::ApiError;
use crate::session::Claims;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .db
        .transaction(|tx| state.identity.list_users(tx, query.q.as_deref()))?;

    Ok(Json(
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .transaction(|tx| state.identity.get_user(tx, id))?
        .ok_or_else(|| ApiError::not_found("user"))?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = ProfileUpdate {
        username: req.username,
        email: req.email,
        image_url: req.image_url,
        header_image_url: req.header_image_url,
        bio: req.bio,
        location: req.location,
    };

    let user = state
        .db
        .transaction(|tx| state.identity.update_profile(tx, claims.sub, update, &req.password))?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .transaction(|tx| state.identity.delete_user(tx, claims.sub))?;

    info!("user #{} deleted their account", claims.sub);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn follow_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.transaction(|tx| graph::follow(tx, claims.sub, id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .transaction(|tx| graph::unfollow(tx, claims.sub, id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn following(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.transaction(|tx| {
        state.identity.get_user(tx, id)?.ok_or(StoreError::NotFound("user"))?;
        graph::following_of(tx, id)
    })?;

    Ok(Json(
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

pub async fn followers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.transaction(|tx| {
        state.identity.get_user(tx, id)?.ok_or(StoreError::NotFound("user"))?;
        graph::followers_of(tx, id)
    })?;

    Ok(Json(
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

pub async fn user_messages(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.db.transaction(|tx| {
        state.identity.get_user(tx, id)?.ok_or(StoreError::NotFound("user"))?;
        content::messages_of(tx, id)
    })?;

    Ok(Json(
        messages
            .into_iter()
            .map(MessageResponse::from)
            .collect::<Vec<_>>(),
    ))
}

pub async fn user_likes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.db.transaction(|tx| {
        state.identity.get_user(tx, id)?.ok_or(StoreError::NotFound("user"))?;
        content::likes_of(tx, id)
    })?;

    Ok(Json(
        messages
            .into_iter()
            .map(MessageResponse::from)
            .collect::<Vec<_>>(),
    ))
}


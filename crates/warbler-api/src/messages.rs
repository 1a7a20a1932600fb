use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use warbler_store::content;
use warbler_types::api::{MessageResponse, NewMessageRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::session::Claims;

pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .db
        .transaction(|tx| content::post_message(tx, claims.sub, &req.text))?;

    info!("new message {}", message);
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .db
        .transaction(|tx| content::get_message(tx, id))?
        .ok_or_else(|| ApiError::not_found("message"))?;

    Ok(Json(MessageResponse::from(message)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .transaction(|tx| content::delete_message(tx, id, claims.sub))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.transaction(|tx| content::like(tx, claims.sub, id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlike_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .transaction(|tx| content::unlike(tx, claims.sub, id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Home timeline: latest messages from the current user and everyone they
/// follow.
pub async fn feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state
        .db
        .transaction(|tx| content::feed_of(tx, claims.sub, content::FEED_LIMIT))?;

    Ok(Json(
        messages
            .into_iter()
            .map(MessageResponse::from)
            .collect::<Vec<_>>(),
    ))
}

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use warbler_store::NewUser;
use warbler_types::api::{AuthResponse, LoginRequest, SignupRequest};
use warbler_types::models::User;

use crate::AppState;
use crate::error::ApiError;
use crate::session;

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.db.transaction(|tx| {
        state.identity.signup(
            tx,
            NewUser {
                username: &req.username,
                email: &req.email,
                password: &req.password,
                image_url: req.image_url.as_deref(),
                header_image_url: None,
                bio: None,
                location: None,
            },
        )
    })?;

    let token = mint_token(&state, &user)?;
    info!("new user {}", user);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: user.id,
            username: user.username,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .transaction(|tx| state.identity.authenticate(tx, &req.username, &req.password))?
        .ok_or_else(|| ApiError::unauthorized("invalid username or password"))?;

    let token = mint_token(&state, &user)?;

    Ok(Json(AuthResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

fn mint_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    session::create_token(&state.session_secret, user).map_err(|e| {
        error!("token minting failed: {e}");
        ApiError::internal()
    })
}

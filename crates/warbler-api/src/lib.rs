pub mod auth;
pub mod error;
pub mod messages;
pub mod session;
pub mod users;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use warbler_db::Database;
use warbler_store::IdentityStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub identity: IdentityStore,
    pub session_secret: String,
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users", get(users::list_users))
        .route(
            "/users/me",
            axum::routing::patch(users::update_profile).delete(users::delete_account),
        )
        .route("/users/{id}", get(users::get_user))
        .route(
            "/users/{id}/follow",
            post(users::follow_user).delete(users::unfollow_user),
        )
        .route("/users/{id}/following", get(users::following))
        .route("/users/{id}/followers", get(users::followers))
        .route("/users/{id}/messages", get(users::user_messages))
        .route("/users/{id}/likes", get(users::user_likes))
        .route("/messages", post(messages::create_message))
        .route(
            "/messages/{id}",
            get(messages::get_message).delete(messages::delete_message),
        )
        .route(
            "/messages/{id}/like",
            post(messages::like_message).delete(messages::unlike_message),
        )
        .route("/feed", get(messages::feed))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod reactions;
pub mod token;

use axum::{
    routing::{get, post},
    Router,
};

pub type DbPool = r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub keys: token::TokenKeys,
}

/// Builds the route table. Read-only browsing is public; creation and
/// mutation go through the auth gate (the [`middleware::AuthUser`]
/// extractor on the handler).
pub fn router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/validate", get(auth::validate))
        // Posts
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/country", get(posts::posts_by_country))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/{id}/related", get(posts::related_posts))
        .route("/posts/{id}/comments", post(posts::create_comment))
        // Reactions
        .route("/posts/{id}/like", post(reactions::like_post))
        .route("/posts/{id}/dislike", post(reactions::dislike_post))
        .with_state(state)
}

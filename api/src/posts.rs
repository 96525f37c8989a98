use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::CookieJar;
use cuisine_shared::{
    Comment, CreateComment, CreatePost, Message, Post, PostDetail, PostSummary, UpdatePost,
};
use rusqlite::{params, Connection, Row};
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::{viewer_from_jar, AuthUser},
    AppState,
};

const POST_COLUMNS: &str =
    "id, user_id, title, description, video_url, recipe, country, likes, dislikes, created_at";

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        video_url: row.get(4)?,
        recipe: row.get(5)?,
        country: row.get(6)?,
        likes: row.get(7)?,
        dislikes: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn load_post(conn: &Connection, id: i64) -> Result<Post, ApiError> {
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
        [id],
        post_from_row,
    )
    .map_err(|_| ApiError::NotFound("post"))
}

fn load_comments(conn: &Connection, post_id: i64) -> Result<Vec<Comment>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, text, created_at FROM comments
         WHERE post_id = ?1
         ORDER BY created_at ASC, id ASC",
    )?;

    let rows = stmt
        .query_map([post_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                text: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect::<Vec<_>>();

    Ok(rows)
}

fn load_reaction_list(
    conn: &Connection,
    table: &str,
    user_id: i64,
) -> Result<Vec<i64>, ApiError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT post_id FROM {table} WHERE user_id = ?1 ORDER BY post_id"
    ))?;

    let rows = stmt
        .query_map([user_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect::<Vec<_>>();

    Ok(rows)
}

// ── Listing ──

#[derive(Deserialize)]
pub struct ListParams {
    sort: Option<String>,
    limit: Option<i64>,
}

/// GET /posts — default is a random sample of positively-liked posts;
/// `?sort=top&limit=N` switches to top-N by likes. The modes are
/// alternatives, never combined.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let pool = state.db.clone();
    let top = params.sort.as_deref() == Some("top");
    let limit = params.limit.unwrap_or(10).clamp(1, 50);

    let posts = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;

        let sql = if top {
            format!("SELECT {POST_COLUMNS} FROM posts ORDER BY likes DESC LIMIT ?1")
        } else {
            format!("SELECT {POST_COLUMNS} FROM posts WHERE likes > 0 ORDER BY RANDOM() LIMIT ?1")
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([limit], post_from_row)?
            .filter_map(|r| r.ok())
            .collect::<Vec<_>>();

        Ok::<_, ApiError>(rows)
    })
    .await??;

    Ok(Json(posts))
}

/// GET /posts/{id} — public; a valid token cookie additionally returns
/// the caller's reaction lists, an invalid one degrades to the anonymous
/// shape.
pub async fn get_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, ApiError> {
    let viewer = viewer_from_jar(&jar, &state);
    let pool = state.db.clone();

    let detail = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        let post = load_post(&conn, id)?;
        let comments = load_comments(&conn, id)?;

        let (likes_list, dislike_list) = match viewer {
            Some(user) => (
                Some(load_reaction_list(&conn, "user_likes", user.id)?),
                Some(load_reaction_list(&conn, "user_dislikes", user.id)?),
            ),
            None => (None, None),
        };

        Ok::<_, ApiError>(PostDetail {
            post,
            comments,
            likes_list,
            dislike_list,
        })
    })
    .await??;

    Ok(Json(detail))
}

/// GET /posts/{id}/related — posts sharing the country tag, excluding
/// the post itself.
pub async fn related_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let pool = state.db.clone();

    let posts = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        let post = load_post(&conn, id)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE country = ?1 AND id != ?2"
        ))?;
        let rows = stmt
            .query_map(params![post.country, id], post_from_row)?
            .filter_map(|r| r.ok())
            .collect::<Vec<_>>();

        Ok::<_, ApiError>(rows)
    })
    .await??;

    Ok(Json(posts))
}

#[derive(Deserialize)]
pub struct CountryParams {
    country: Option<String>,
}

/// GET /posts/country?country=X — summaries with the owner's display
/// name joined in.
pub async fn posts_by_country(
    State(state): State<AppState>,
    Query(params): Query<CountryParams>,
) -> Result<Json<Vec<PostSummary>>, ApiError> {
    let country = params
        .country
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("country is required".to_string()))?;

    let pool = state.db.clone();

    let posts = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT p.id, p.title, u.name, p.country, p.created_at
             FROM posts p
             JOIN users u ON p.user_id = u.id
             WHERE p.country = ?1
             ORDER BY p.created_at DESC",
        )?;

        let rows = stmt
            .query_map([&country], |row| {
                Ok(PostSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    user_name: row.get(2)?,
                    country: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect::<Vec<_>>();

        Ok::<_, ApiError>(rows)
    })
    .await??;

    Ok(Json(posts))
}

// ── Mutations ──

/// POST /posts — owner stamped from the gate, counters zeroed.
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let title = ammonia::clean(payload.title.trim());
    let country = payload.country.trim().to_string();

    if title.is_empty() || country.is_empty() {
        return Err(ApiError::Validation(
            "title and country are required".to_string(),
        ));
    }

    let description = ammonia::clean(payload.description.trim());
    let recipe = ammonia::clean(payload.recipe.trim());
    let video_url = payload.video_url.trim().to_string();

    let pool = state.db.clone();
    let user_id = user.id;

    let post = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;

        conn.execute(
            "INSERT INTO posts (user_id, title, description, video_url, recipe, country, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user_id,
                title,
                description,
                video_url,
                recipe,
                country,
                chrono::Utc::now().timestamp()
            ],
        )?;

        load_post(&conn, conn.last_insert_rowid())
    })
    .await??;

    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /posts/{id} — owner-only; the whitelist of mutable fields is
/// title, description, and recipe. A non-owner's update matches zero
/// rows and reads as not found.
pub async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePost>,
) -> Result<Json<Post>, ApiError> {
    let title = ammonia::clean(payload.title.trim());
    if title.is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }

    let description = ammonia::clean(payload.description.trim());
    let recipe = ammonia::clean(payload.recipe.trim());

    let pool = state.db.clone();
    let user_id = user.id;

    let post = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;

        let affected = conn.execute(
            "UPDATE posts SET title = ?1, description = ?2, recipe = ?3
             WHERE id = ?4 AND user_id = ?5",
            params![title, description, recipe, id, user_id],
        )?;

        if affected == 0 {
            return Err(ApiError::NotFound("post"));
        }

        load_post(&conn, id)
    })
    .await??;

    Ok(Json(post))
}

/// DELETE /posts/{id} — owner-only, same zero-rows rule as update.
pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Message>, ApiError> {
    let pool = state.db.clone();
    let user_id = user.id;

    tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;

        let affected = conn.execute(
            "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;

        if affected == 0 {
            return Err(ApiError::NotFound("post"));
        }

        conn.execute("DELETE FROM comments WHERE post_id = ?1", [id])?;
        conn.execute("DELETE FROM user_likes WHERE post_id = ?1", [id])?;
        conn.execute("DELETE FROM user_dislikes WHERE post_id = ?1", [id])?;

        Ok::<_, ApiError>(())
    })
    .await??;

    Ok(Json(Message {
        message: "post deleted".to_string(),
    }))
}

/// POST /posts/{id}/comments — append-only; the author's display name is
/// snapshotted from the users table at creation time.
pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let text = ammonia::clean(payload.text.trim());
    if text.is_empty() {
        return Err(ApiError::Validation("text is required".to_string()));
    }

    let pool = state.db.clone();
    let user_id = user.id;

    let comment = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;

        // Verify the post exists before appending.
        load_post(&conn, post_id)?;

        let name: String = conn
            .query_row("SELECT name FROM users WHERE id = ?1", [user_id], |row| {
                row.get(0)
            })
            .map_err(|_| ApiError::NotFound("user"))?;

        conn.execute(
            "INSERT INTO comments (post_id, user_id, name, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                post_id,
                user_id,
                name,
                text,
                chrono::Utc::now().timestamp()
            ],
        )?;

        let id = conn.last_insert_rowid();
        let comment = conn.query_row(
            "SELECT id, user_id, name, text, created_at FROM comments WHERE id = ?1",
            [id],
            |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    text: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )?;

        Ok::<_, ApiError>(comment)
    })
    .await??;

    Ok((StatusCode::CREATED, Json(comment)))
}

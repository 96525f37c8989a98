//! Like/dislike toggle reconciliation.
//!
//! A user's reaction to a post is a tri-state derived from two
//! independently stored membership sets. Each toggle keeps the sets
//! mutually exclusive and bumps the post's aggregate counters by ±1 per
//! transition. The branch decision is taken from a read that can go
//! stale before the writes land; the counter bumps themselves are
//! single-field atomic updates.

use axum::{
    extract::{Path, State},
    Json,
};
use cuisine_shared::ReactionCounts;
use rusqlite::{params, Connection};

use crate::{error::ApiError, middleware::AuthUser, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Neutral,
    Liked,
    Disliked,
}

fn in_set(conn: &Connection, table: &str, user_id: i64, post_id: i64) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE user_id = ?1 AND post_id = ?2)"),
        params![user_id, post_id],
        |row| row.get(0),
    )?;
    Ok(exists != 0)
}

/// Two membership lookups; the sets are maintained independently, so
/// both must be consulted to recover the tri-state.
pub fn current_reaction(
    conn: &Connection,
    user_id: i64,
    post_id: i64,
) -> rusqlite::Result<Reaction> {
    if in_set(conn, "user_likes", user_id, post_id)? {
        return Ok(Reaction::Liked);
    }
    if in_set(conn, "user_dislikes", user_id, post_id)? {
        return Ok(Reaction::Disliked);
    }
    Ok(Reaction::Neutral)
}

fn post_exists(conn: &Connection, post_id: i64) -> Result<(), ApiError> {
    conn.query_row("SELECT id FROM posts WHERE id = ?1", [post_id], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|_| ApiError::NotFound("post"))?;
    Ok(())
}

fn read_counts(conn: &Connection, post_id: i64) -> Result<ReactionCounts, ApiError> {
    let counts = conn
        .query_row(
            "SELECT likes, dislikes FROM posts WHERE id = ?1",
            [post_id],
            |row| {
                Ok(ReactionCounts {
                    likes: row.get(0)?,
                    dislikes: row.get(1)?,
                })
            },
        )
        .map_err(|_| ApiError::NotFound("post"))?;
    Ok(counts)
}

/// Toggle the user's like on a post.
///
/// Liked → Neutral, Neutral → Liked, Disliked → Liked. The opposite
/// reaction is always removed before the new one is inserted, and the
/// returned counters come from a re-read of the post row after the
/// mutations.
pub fn toggle_like(
    conn: &Connection,
    user_id: i64,
    post_id: i64,
) -> Result<ReactionCounts, ApiError> {
    post_exists(conn, post_id)?;

    match current_reaction(conn, user_id, post_id)? {
        Reaction::Liked => {
            conn.execute(
                "DELETE FROM user_likes WHERE user_id = ?1 AND post_id = ?2",
                params![user_id, post_id],
            )?;
            conn.execute(
                "UPDATE posts SET likes = likes - 1 WHERE id = ?1",
                [post_id],
            )?;
        }
        state => {
            if state == Reaction::Disliked {
                conn.execute(
                    "DELETE FROM user_dislikes WHERE user_id = ?1 AND post_id = ?2",
                    params![user_id, post_id],
                )?;
                conn.execute(
                    "UPDATE posts SET dislikes = dislikes - 1 WHERE id = ?1",
                    [post_id],
                )?;
            }
            conn.execute(
                "INSERT OR IGNORE INTO user_likes (user_id, post_id) VALUES (?1, ?2)",
                params![user_id, post_id],
            )?;
            conn.execute(
                "UPDATE posts SET likes = likes + 1 WHERE id = ?1",
                [post_id],
            )?;
        }
    }

    read_counts(conn, post_id)
}

/// Mirror of [`toggle_like`] over the dislike set and counter.
pub fn toggle_dislike(
    conn: &Connection,
    user_id: i64,
    post_id: i64,
) -> Result<ReactionCounts, ApiError> {
    post_exists(conn, post_id)?;

    match current_reaction(conn, user_id, post_id)? {
        Reaction::Disliked => {
            conn.execute(
                "DELETE FROM user_dislikes WHERE user_id = ?1 AND post_id = ?2",
                params![user_id, post_id],
            )?;
            conn.execute(
                "UPDATE posts SET dislikes = dislikes - 1 WHERE id = ?1",
                [post_id],
            )?;
        }
        state => {
            if state == Reaction::Liked {
                conn.execute(
                    "DELETE FROM user_likes WHERE user_id = ?1 AND post_id = ?2",
                    params![user_id, post_id],
                )?;
                conn.execute(
                    "UPDATE posts SET likes = likes - 1 WHERE id = ?1",
                    [post_id],
                )?;
            }
            conn.execute(
                "INSERT OR IGNORE INTO user_dislikes (user_id, post_id) VALUES (?1, ?2)",
                params![user_id, post_id],
            )?;
            conn.execute(
                "UPDATE posts SET dislikes = dislikes + 1 WHERE id = ?1",
                [post_id],
            )?;
        }
    }

    read_counts(conn, post_id)
}

// ── Handlers ──

/// POST /posts/{id}/like
pub async fn like_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ReactionCounts>, ApiError> {
    let pool = state.db.clone();
    let user_id = user.id;

    let counts = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        toggle_like(&conn, user_id, post_id)
    })
    .await??;

    Ok(Json(counts))
}

/// POST /posts/{id}/dislike
pub async fn dislike_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ReactionCounts>, ApiError> {
    let pool = state.db.clone();
    let user_id = user.id;

    let counts = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        toggle_dislike(&conn, user_id, post_id)
    })
    .await??;

    Ok(Json(counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::migrate(&conn).unwrap();
        conn
    }

    fn add_user(conn: &Connection, name: &str) -> i64 {
        conn.execute(
            "INSERT INTO users (name, email, password_hash, created_at) VALUES (?1, ?2, 'x', 0)",
            params![name, format!("{name}@example.com")],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn add_post(conn: &Connection, owner: i64) -> i64 {
        conn.execute(
            "INSERT INTO posts (user_id, title, country, created_at) VALUES (?1, 'Tajine', 'MA', 0)",
            [owner],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn set_sizes(conn: &Connection, post_id: i64) -> (i64, i64) {
        let likes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM user_likes WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )
            .unwrap();
        let dislikes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM user_dislikes WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )
            .unwrap();
        (likes, dislikes)
    }

    #[test]
    fn like_toggle_is_idempotent_as_a_pair() {
        let conn = setup();
        let user = add_user(&conn, "ana");
        let post = add_post(&conn, user);

        let first = toggle_like(&conn, user, post).unwrap();
        assert_eq!((first.likes, first.dislikes), (1, 0));
        assert_eq!(current_reaction(&conn, user, post).unwrap(), Reaction::Liked);

        let second = toggle_like(&conn, user, post).unwrap();
        assert_eq!((second.likes, second.dislikes), (0, 0));
        assert_eq!(
            current_reaction(&conn, user, post).unwrap(),
            Reaction::Neutral
        );
        assert_eq!(set_sizes(&conn, post), (0, 0));
    }

    #[test]
    fn dislike_toggle_is_idempotent_as_a_pair() {
        let conn = setup();
        let user = add_user(&conn, "ana");
        let post = add_post(&conn, user);

        let first = toggle_dislike(&conn, user, post).unwrap();
        assert_eq!((first.likes, first.dislikes), (0, 1));

        let second = toggle_dislike(&conn, user, post).unwrap();
        assert_eq!((second.likes, second.dislikes), (0, 0));
        assert_eq!(
            current_reaction(&conn, user, post).unwrap(),
            Reaction::Neutral
        );
    }

    #[test]
    fn cross_toggle_moves_both_counters() {
        let conn = setup();
        let user = add_user(&conn, "ana");
        let post = add_post(&conn, user);

        toggle_dislike(&conn, user, post).unwrap();
        let counts = toggle_like(&conn, user, post).unwrap();

        assert_eq!((counts.likes, counts.dislikes), (1, 0));
        assert_eq!(current_reaction(&conn, user, post).unwrap(), Reaction::Liked);
        assert_eq!(set_sizes(&conn, post), (1, 0));
    }

    #[test]
    fn sets_stay_mutually_exclusive_over_any_sequence() {
        let conn = setup();
        let user = add_user(&conn, "ana");
        let post = add_post(&conn, user);

        enum Op {
            Like,
            Dislike,
        }
        let sequence = [
            Op::Like,
            Op::Dislike,
            Op::Dislike,
            Op::Like,
            Op::Like,
            Op::Dislike,
            Op::Like,
        ];

        for op in sequence {
            match op {
                Op::Like => toggle_like(&conn, user, post).unwrap(),
                Op::Dislike => toggle_dislike(&conn, user, post).unwrap(),
            };
            let liked = in_set(&conn, "user_likes", user, post).unwrap();
            let disliked = in_set(&conn, "user_dislikes", user, post).unwrap();
            assert!(
                !(liked && disliked),
                "post in both reaction sets after a toggle"
            );
        }
    }

    #[test]
    fn counters_match_memberships_across_users() {
        let conn = setup();
        let owner = add_user(&conn, "owner");
        let post = add_post(&conn, owner);

        let users: Vec<i64> = (0..5).map(|i| add_user(&conn, &format!("u{i}"))).collect();

        toggle_like(&conn, users[0], post).unwrap();
        toggle_like(&conn, users[1], post).unwrap();
        toggle_dislike(&conn, users[2], post).unwrap();
        toggle_like(&conn, users[3], post).unwrap();
        toggle_like(&conn, users[3], post).unwrap(); // back to neutral
        toggle_dislike(&conn, users[4], post).unwrap();
        toggle_like(&conn, users[4], post).unwrap(); // flipped

        let counts = read_counts(&conn, post).unwrap();
        assert_eq!(set_sizes(&conn, post), (counts.likes, counts.dislikes));
        assert_eq!((counts.likes, counts.dislikes), (3, 1));
    }

    #[test]
    fn unknown_post_is_not_found() {
        let conn = setup();
        let user = add_user(&conn, "ana");

        match toggle_like(&conn, user, 999) {
            Err(ApiError::NotFound(_)) => {}
            other => panic!("expected not found, got {other:?}"),
        }
    }
}

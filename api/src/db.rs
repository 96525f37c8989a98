use rusqlite::Connection;

use crate::DbPool;

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;
    migrate(&conn)?;
    Ok(())
}

/// A user's like set and dislike set are persisted as two independent
/// membership tables; a post's `likes`/`dislikes` columns are aggregate
/// counters maintained incrementally by the reaction reconciler.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            name          TEXT NOT NULL,
            email         TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at    INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            video_url   TEXT NOT NULL DEFAULT '',
            recipe      TEXT NOT NULL DEFAULT '',
            country     TEXT NOT NULL,
            likes       INTEGER NOT NULL DEFAULT 0,
            dislikes    INTEGER NOT NULL DEFAULT 0,
            created_at  INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_posts_country ON posts(country);
        CREATE INDEX IF NOT EXISTS idx_posts_likes ON posts(likes);

        CREATE TABLE IF NOT EXISTS comments (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id    INTEGER NOT NULL REFERENCES posts(id),
            user_id    INTEGER NOT NULL REFERENCES users(id),
            name       TEXT NOT NULL,
            text       TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);

        CREATE TABLE IF NOT EXISTS user_likes (
            user_id INTEGER NOT NULL REFERENCES users(id),
            post_id INTEGER NOT NULL REFERENCES posts(id),
            UNIQUE(user_id, post_id)
        );
        CREATE INDEX IF NOT EXISTS idx_user_likes_post ON user_likes(post_id);

        CREATE TABLE IF NOT EXISTS user_dislikes (
            user_id INTEGER NOT NULL REFERENCES users(id),
            post_id INTEGER NOT NULL REFERENCES posts(id),
            UNIQUE(user_id, post_id)
        );
        CREATE INDEX IF NOT EXISTS idx_user_dislikes_post ON user_dislikes(post_id);
        ",
    )
}

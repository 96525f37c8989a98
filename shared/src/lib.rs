use serde::{Deserialize, Serialize};

// ── Auth ──

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// ── Posts ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub recipe: String,
    pub country: String,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub text: String,
    pub created_at: i64,
}

/// Full post view. The reaction lists are present only when the caller
/// was authenticated; they hold the ids of every post the caller
/// currently likes or dislikes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes_list: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dislike_list: Option<Vec<i64>>,
}

/// Trimmed listing shape for country browsing, with the owner's display
/// name joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub user_name: String,
    pub country: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub recipe: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recipe: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    #[serde(default)]
    pub text: String,
}

// ── Reactions ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub likes: i64,
    pub dislikes: i64,
}

// ── Misc ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

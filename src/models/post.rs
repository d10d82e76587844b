use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    // 种子/导入的作品可能没有站内作者
    pub author_id: Option<String>,
    pub content: String,
    pub attribution: Option<String>,
    pub kind: PostKind,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Poetry,
    Prose,
    Quote,
}

impl Default for PostKind {
    fn default() -> Self {
        Self::Poetry
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,

    #[validate(length(max = 200))]
    pub attribution: Option<String>,

    pub kind: PostKind,
}

/// 带当前观看者状态的帖子（feed 列表项）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithViewerState {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<AuthorInfo>,
    pub is_liked: bool,
    pub is_saved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<PostWithViewerState>,
    pub next_cursor: Option<usize>,
    pub has_more: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub cursor: Option<String>,
}

impl Post {
    pub fn new(author_id: Option<String>, content: String, attribution: Option<String>, kind: PostKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author_id,
            content,
            attribution,
            kind,
            like_count: 0,
            comment_count: 0,
            created_at: Utc::now(),
        }
    }
}

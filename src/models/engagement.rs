use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// like/save 行的复合身份是 (user_id, post_id)，记录ID即 `like:[user, post]`，
/// 行的存在与否是点赞/收藏状态的唯一事实来源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleLikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleSaveResponse {
    pub saved: bool,
}

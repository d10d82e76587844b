use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub user_id: String, // Rainbow-Auth 用户ID
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateUserProfileRequest {
    #[validate(length(min = 3, max = 20))]
    pub username: String,

    #[validate(length(min = 1, max = 50))]
    pub display_name: String,

    #[validate(length(max = 150))]
    pub bio: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateUserProfileRequest {
    #[validate(length(min = 1, max = 50))]
    pub display_name: Option<String>,

    #[validate(length(max = 150))]
    pub bio: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// 个人主页视图：关注数/粉丝数/帖子数每次读取时实时统计，不做反规范化
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    pub is_following: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: String, username: String, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            username,
            display_name,
            bio: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

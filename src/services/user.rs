use crate::{
    error::{AppError, Result},
    models::user::{CreateUserProfileRequest, ProfileResponse, UpdateUserProfileRequest, UserProfile},
    services::{Database, FollowService},
    utils::validation::{validate_display_name, validate_handle},
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
    follow_service: FollowService,
}

impl UserService {
    pub async fn new(db: Arc<Database>, follow_service: FollowService) -> Result<Self> {
        Ok(Self { db, follow_service })
    }

    pub async fn get_profile_by_user_id(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let mut response = self.db.query_with_params(
            "SELECT *, meta::id(id) AS id FROM user_profile WHERE user_id = $user_id",
            json!({ "user_id": user_id }),
        ).await?;

        let profiles: Vec<UserProfile> = response.take(0)?;
        Ok(profiles.into_iter().next())
    }

    pub async fn get_profile_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        let mut response = self.db.query_with_params(
            "SELECT *, meta::id(id) AS id FROM user_profile \
             WHERE string::lowercase(username) = string::lowercase($username)",
            json!({ "username": username }),
        ).await?;

        let profiles: Vec<UserProfile> = response.take(0)?;
        Ok(profiles.into_iter().next())
    }

    /// 认证请求首次到达时为用户建立占位档案
    pub async fn get_or_create_profile(
        &self,
        user_id: &str,
        username_hint: Option<String>,
        display_name_hint: Option<String>,
    ) -> Result<UserProfile> {
        if let Some(existing) = self.get_profile_by_user_id(user_id).await? {
            return Ok(existing);
        }

        let username = self.derive_unique_handle(username_hint.as_deref()).await?;
        let display_name = display_name_hint
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| username.clone());

        let profile = UserProfile::new(user_id.to_string(), username, display_name);
        self.db.create("user_profile", &profile.id, &profile).await?;

        info!("Created placeholder profile for user {}", user_id);
        Ok(profile)
    }

    /// 资料补全：设定正式用户名（大小写不敏感唯一）、显示名、简介
    pub async fn complete_profile(
        &self,
        user_id: &str,
        request: CreateUserProfileRequest,
    ) -> Result<UserProfile> {
        debug!("Completing profile for user: {}", user_id);

        request.validate().map_err(AppError::ValidatorError)?;
        validate_handle(&request.username)?;
        validate_display_name(&request.display_name)?;

        if self.is_handle_taken(&request.username, Some(user_id)).await? {
            return Err(AppError::conflict("Username is already taken"));
        }

        let updated = match self.get_profile_by_user_id(user_id).await? {
            Some(existing) => {
                let mut response = self.db.query_with_params(
                    "UPDATE type::thing('user_profile', $id) MERGE $updates RETURN AFTER",
                    json!({
                        "id": existing.id,
                        "updates": {
                            "username": request.username,
                            "display_name": request.display_name,
                            "bio": request.bio,
                            "avatar_url": request.avatar_url,
                            "updated_at": Utc::now(),
                        },
                    }),
                ).await?;

                let rows: Vec<serde_json::Value> = response.take(0)?;
                if rows.is_empty() {
                    return Err(AppError::internal("Failed to update profile"));
                }

                self.get_profile_by_user_id(user_id)
                    .await?
                    .ok_or_else(|| AppError::internal("Profile vanished during update"))?
            }
            None => {
                let mut profile = UserProfile::new(
                    user_id.to_string(),
                    request.username,
                    request.display_name,
                );
                profile.bio = request.bio;
                profile.avatar_url = request.avatar_url;

                self.db.create("user_profile", &profile.id, &profile).await?;
                profile
            }
        };

        info!("Profile completed for user {}", user_id);
        Ok(updated)
    }

    /// 更新资料（显示名/简介/头像；用户名不在此处修改）
    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateUserProfileRequest,
    ) -> Result<UserProfile> {
        request.validate().map_err(AppError::ValidatorError)?;

        if let Some(name) = &request.display_name {
            validate_display_name(name)?;
        }

        let existing = self
            .get_profile_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile"))?;

        let mut updates = serde_json::Map::new();
        if let Some(name) = request.display_name {
            updates.insert("display_name".into(), json!(name));
        }
        if let Some(bio) = request.bio {
            updates.insert("bio".into(), json!(bio));
        }
        if let Some(avatar) = request.avatar_url {
            updates.insert("avatar_url".into(), json!(avatar));
        }
        updates.insert("updated_at".into(), json!(Utc::now()));

        self.db.query_with_params(
            "UPDATE type::thing('user_profile', $id) MERGE $updates",
            json!({
                "id": existing.id,
                "updates": updates,
            }),
        ).await?;

        self.get_profile_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::internal("Profile vanished during update"))
    }

    /// 个人主页视图：三项计数每次实时统计，另附观看者的关注状态
    pub async fn get_profile_view(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> Result<ProfileResponse> {
        let profile = self
            .get_profile_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let follower_count = self.db.count(
            "SELECT count() AS count FROM follow WHERE following_id = $user_id GROUP ALL",
            json!({ "user_id": profile.user_id }),
        ).await?;

        let following_count = self.db.count(
            "SELECT count() AS count FROM follow WHERE follower_id = $user_id GROUP ALL",
            json!({ "user_id": profile.user_id }),
        ).await?;

        let post_count = self.db.count(
            "SELECT count() AS count FROM post WHERE author_id = $user_id GROUP ALL",
            json!({ "user_id": profile.user_id }),
        ).await?;

        let is_following = match viewer_id {
            Some(viewer) if viewer != profile.user_id => {
                self.follow_service.is_following(viewer, &profile.user_id).await?
            }
            _ => false,
        };

        Ok(ProfileResponse {
            id: profile.id,
            user_id: profile.user_id,
            username: profile.username,
            display_name: profile.display_name,
            bio: profile.bio,
            avatar_url: profile.avatar_url,
            follower_count,
            following_count,
            post_count,
            is_following,
            created_at: profile.created_at,
        })
    }

    async fn is_handle_taken(&self, username: &str, exclude_user_id: Option<&str>) -> Result<bool> {
        let mut response = self.db.query_with_params(
            "SELECT user_id FROM user_profile \
             WHERE string::lowercase(username) = string::lowercase($username)",
            json!({ "username": username }),
        ).await?;

        let rows: Vec<serde_json::Value> = response.take(0)?;
        Ok(rows.iter().any(|row| {
            row.get("user_id").and_then(|v| v.as_str()) != exclude_user_id
        }))
    }

    /// 从 Rainbow-Auth 的用户名线索推导一个可用的占位用户名
    async fn derive_unique_handle(&self, hint: Option<&str>) -> Result<String> {
        let base: String = hint
            .unwrap_or("reader")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .take(20)
            .collect();

        let base = if base.len() < 3 { "reader".to_string() } else { base };

        if !self.is_handle_taken(&base, None).await? {
            return Ok(base);
        }

        // 截断后缀保证总长不超过 20
        let suffix = Uuid::new_v4().simple().to_string();
        let stem: String = base.chars().take(13).collect();
        Ok(format!("{}_{}", stem, &suffix[..6]))
    }
}

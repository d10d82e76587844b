use crate::{
    error::{AppError, Result},
    models::follow::{Follow, FollowUserInfo, ToggleFollowResponse},
    models::user::UserProfile,
    services::Database,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// 关注服务。与点赞/收藏同样的切换纪律，但没有反规范化计数器：
/// 粉丝数/关注数在读取时实时统计
#[derive(Clone)]
pub struct FollowService {
    db: Arc<Database>,
}

impl FollowService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 切换关注状态，返回切换后的状态
    pub async fn toggle_follow(&self, follower_id: &str, following_id: &str) -> Result<ToggleFollowResponse> {
        debug!("User {} toggling follow on user {}", follower_id, following_id);

        // 不允许关注自己
        if follower_id == following_id {
            return Err(AppError::Validation("Cannot follow yourself".to_string()));
        }

        // 被关注用户必须存在
        let mut response = self.db.query_with_params(
            "SELECT user_id FROM user_profile WHERE user_id = $user_id",
            json!({ "user_id": following_id }),
        ).await?;
        let targets: Vec<serde_json::Value> = response.take(0)?;
        if targets.is_empty() {
            return Err(AppError::not_found("User"));
        }

        let params = json!({
            "follower_id": follower_id,
            "following_id": following_id,
        });

        if self.is_following(follower_id, following_id).await? {
            self.db.query_with_params(
                "DELETE type::thing('follow', [$follower_id, $following_id])",
                params,
            ).await?;

            info!("User {} unfollowed user {}", follower_id, following_id);
            Ok(ToggleFollowResponse { following: false })
        } else {
            let created = self.db.query_with_params(
                "CREATE type::thing('follow', [$follower_id, $following_id]) \
                 CONTENT { follower_id: $follower_id, following_id: $following_id, created_at: time::now() }",
                params,
            ).await;

            match created {
                Ok(_) => {
                    info!("User {} followed user {}", follower_id, following_id);
                    Ok(ToggleFollowResponse { following: true })
                }
                Err(AppError::Conflict(msg)) => {
                    // 并发重复提交：按当前状态返回
                    debug!("Concurrent duplicate follow ({}, {}): {}", follower_id, following_id, msg);
                    let following = self.is_following(follower_id, following_id).await?;
                    Ok(ToggleFollowResponse { following })
                }
                Err(e) => Err(e),
            }
        }
    }

    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let mut response = self.db.query_with_params(
            "SELECT * FROM type::thing('follow', [$follower_id, $following_id])",
            json!({
                "follower_id": follower_id,
                "following_id": following_id,
            }),
        ).await?;

        let rows: Vec<Follow> = response.take(0)?;
        Ok(!rows.is_empty())
    }

    /// 获取用户的关注者列表
    pub async fn get_followers(
        &self,
        user_id: &str,
        current_user_id: Option<&str>,
        page: Option<i32>,
        limit: Option<i32>,
    ) -> Result<Vec<FollowUserInfo>> {
        debug!("Getting followers for user: {}", user_id);

        let ids = self.follow_edge_ids(
            "SELECT follower_id AS peer FROM follow WHERE following_id = $user_id \
             ORDER BY created_at DESC LIMIT $limit START $offset",
            user_id, page, limit,
        ).await?;

        self.load_user_infos(&ids, current_user_id).await
    }

    /// 获取用户关注的人列表
    pub async fn get_following(
        &self,
        user_id: &str,
        current_user_id: Option<&str>,
        page: Option<i32>,
        limit: Option<i32>,
    ) -> Result<Vec<FollowUserInfo>> {
        debug!("Getting following for user: {}", user_id);

        let ids = self.follow_edge_ids(
            "SELECT following_id AS peer FROM follow WHERE follower_id = $user_id \
             ORDER BY created_at DESC LIMIT $limit START $offset",
            user_id, page, limit,
        ).await?;

        self.load_user_infos(&ids, current_user_id).await
    }

    async fn follow_edge_ids(
        &self,
        sql: &str,
        user_id: &str,
        page: Option<i32>,
        limit: Option<i32>,
    ) -> Result<Vec<String>> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(20).min(100);
        let offset = (page - 1) * limit;

        let mut response = self.db.query_with_params(sql, json!({
            "user_id": user_id,
            "limit": limit,
            "offset": offset,
        })).await?;

        let rows: Vec<serde_json::Value> = response.take(0)?;
        Ok(rows
            .into_iter()
            .filter_map(|v| v.get("peer").and_then(|p| p.as_str()).map(String::from))
            .collect())
    }

    async fn load_user_infos(
        &self,
        user_ids: &[String],
        current_user_id: Option<&str>,
    ) -> Result<Vec<FollowUserInfo>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut response = self.db.query_with_params(
            "SELECT * FROM user_profile WHERE user_id IN $ids",
            json!({ "ids": user_ids }),
        ).await?;

        let profiles: Vec<UserProfile> = response.take(0)?;

        // 保持关注时间排序
        let mut by_id: std::collections::HashMap<String, UserProfile> = profiles
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect();

        let mut result = Vec::new();
        for id in user_ids {
            let profile = match by_id.remove(id) {
                Some(p) => p,
                None => continue,
            };

            let is_following = match current_user_id {
                Some(current) if current != profile.user_id => {
                    self.is_following(current, &profile.user_id).await?
                }
                _ => false,
            };

            result.push(FollowUserInfo {
                user_id: profile.user_id,
                username: profile.username,
                display_name: profile.display_name,
                avatar_url: profile.avatar_url,
                bio: profile.bio,
                is_following,
            });
        }

        Ok(result)
    }
}

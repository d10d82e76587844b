use crate::{
    error::{AppError, Result},
    models::engagement::{Membership, ToggleLikeResponse, ToggleSaveResponse},
    models::post::Post,
    services::Database,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 点赞/收藏切换服务。
///
/// 成员行的记录ID是 `[user_id, post_id]` 复合键，即数据库层面的唯一约束：
/// 并发重复提交时第二个 CREATE 失败，整个事务连同配对的计数器更新一起回滚。
/// 计数器只在这里和评论路径被写，且始终与行变更同处一个事务
#[derive(Clone)]
pub struct EngagementService {
    db: Arc<Database>,
}

impl EngagementService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 切换点赞状态，返回切换后的状态和帖子当前点赞数
    pub async fn toggle_like(&self, user_id: &str, post_id: &str) -> Result<ToggleLikeResponse> {
        debug!("User {} toggling like on post {}", user_id, post_id);

        let liked = self.toggle_membership("like", Some("like_count"), user_id, post_id).await?;
        let like_count = self.current_like_count(post_id).await?;

        Ok(ToggleLikeResponse { liked, like_count })
    }

    /// 切换收藏状态。帖子上没有收藏计数，只翻转成员行
    pub async fn toggle_save(&self, user_id: &str, post_id: &str) -> Result<ToggleSaveResponse> {
        debug!("User {} toggling save on post {}", user_id, post_id);

        let saved = self.toggle_membership("save", None, user_id, post_id).await?;

        Ok(ToggleSaveResponse { saved })
    }

    async fn toggle_membership(
        &self,
        table: &str,
        counter_field: Option<&str>,
        user_id: &str,
        post_id: &str,
    ) -> Result<bool> {
        // 帖子必须存在
        let post: Option<Post> = self.db.get_by_id("post", post_id).await?;
        if post.is_none() {
            return Err(AppError::not_found("Post"));
        }

        let params = json!({
            "tb": table,
            "user_id": user_id,
            "post_id": post_id,
        });

        if self.is_member(table, user_id, post_id).await? {
            // 删除行；计数器减 1 与实际删除在同一事务内配对，
            // 并发的重复取消只会让其中一方真正删到行
            let sql = match counter_field {
                Some(field) => format!(
                    "BEGIN TRANSACTION; \
                     LET $gone = (DELETE type::thing($tb, [$user_id, $post_id]) RETURN BEFORE); \
                     IF array::len($gone) > 0 THEN \
                         (UPDATE type::thing('post', $post_id) SET {field} -= 1 WHERE {field} > 0) \
                     END; \
                     COMMIT TRANSACTION;",
                    field = field
                ),
                None => "BEGIN TRANSACTION; \
                         DELETE type::thing($tb, [$user_id, $post_id]); \
                         COMMIT TRANSACTION;"
                    .to_string(),
            };

            self.db.query_with_params(&sql, params).await?;
            Ok(false)
        } else {
            let sql = match counter_field {
                Some(field) => format!(
                    "BEGIN TRANSACTION; \
                     CREATE type::thing($tb, [$user_id, $post_id]) \
                         CONTENT {{ user_id: $user_id, post_id: $post_id, created_at: time::now() }}; \
                     UPDATE type::thing('post', $post_id) SET {field} += 1; \
                     COMMIT TRANSACTION;",
                    field = field
                ),
                None => "BEGIN TRANSACTION; \
                         CREATE type::thing($tb, [$user_id, $post_id]) \
                             CONTENT { user_id: $user_id, post_id: $post_id, created_at: time::now() }; \
                         COMMIT TRANSACTION;"
                    .to_string(),
            };

            match self.db.query_with_params(&sql, params).await {
                Ok(_) => Ok(true),
                Err(AppError::Conflict(msg)) => {
                    // 并发重复提交：行已被另一请求创建，事务已整体回滚。
                    // 重新读取成员状态并返回当前值，而不是把冲突抛给用户
                    debug!("Concurrent duplicate toggle on {} ({}, {}): {}", table, user_id, post_id, msg);
                    self.is_member(table, user_id, post_id).await
                }
                Err(e) => Err(e),
            }
        }
    }

    pub async fn is_member(&self, table: &str, user_id: &str, post_id: &str) -> Result<bool> {
        let mut response = self.db.query_with_params(
            "SELECT * FROM type::thing($tb, [$user_id, $post_id])",
            json!({
                "tb": table,
                "user_id": user_id,
                "post_id": post_id,
            }),
        ).await?;

        let rows: Vec<Membership> = response.take(0)?;
        Ok(!rows.is_empty())
    }

    /// 观看者已点赞的帖子子集（一次集合查询，不做 N+1）
    pub async fn liked_subset(&self, user_id: &str, post_ids: &[String]) -> Result<HashSet<String>> {
        self.membership_subset("like", user_id, post_ids).await
    }

    /// 观看者已收藏的帖子子集
    pub async fn saved_subset(&self, user_id: &str, post_ids: &[String]) -> Result<HashSet<String>> {
        self.membership_subset("save", user_id, post_ids).await
    }

    async fn membership_subset(
        &self,
        table: &str,
        user_id: &str,
        post_ids: &[String],
    ) -> Result<HashSet<String>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut response = self.db.query_with_params(
            "SELECT post_id FROM type::table($tb) WHERE user_id = $user_id AND post_id IN $post_ids",
            json!({
                "tb": table,
                "user_id": user_id,
                "post_ids": post_ids,
            }),
        ).await?;

        let rows: Vec<serde_json::Value> = response.take(0)?;

        Ok(rows
            .into_iter()
            .filter_map(|v| v.get("post_id").and_then(|p| p.as_str()).map(String::from))
            .collect())
    }

    async fn current_like_count(&self, post_id: &str) -> Result<i64> {
        let mut response = self.db.query_with_params(
            "SELECT like_count FROM type::thing('post', $post_id)",
            json!({ "post_id": post_id }),
        ).await?;

        let rows: Vec<serde_json::Value> = response.take(0)?;
        Ok(rows
            .first()
            .and_then(|v| v.get("like_count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    /// 后台维护：用成员行/评论行重算反规范化计数器，修复漂移。
    /// 正常运行时计数器与行数恒等，这里只兜底异常情况（如手工改库）
    pub async fn reconcile_counters(&self) -> Result<()> {
        let mut response = self.db.query(
            "SELECT meta::id(id) AS id, like_count, comment_count FROM post"
        ).await?;

        let posts: Vec<serde_json::Value> = response.take(0)?;
        let mut repaired = 0usize;

        for post in &posts {
            let post_id = match post.get("id").and_then(|v| v.as_str()) {
                Some(id) => id,
                None => continue,
            };
            let like_count = post.get("like_count").and_then(|v| v.as_i64()).unwrap_or(0);
            let comment_count = post.get("comment_count").and_then(|v| v.as_i64()).unwrap_or(0);

            let actual_likes = self.db.count(
                "SELECT count() AS count FROM like WHERE post_id = $post_id GROUP ALL",
                json!({ "post_id": post_id }),
            ).await?;

            let actual_comments = self.db.count(
                "SELECT count() AS count FROM comment WHERE post_id = $post_id GROUP ALL",
                json!({ "post_id": post_id }),
            ).await?;

            if like_count != actual_likes || comment_count != actual_comments {
                warn!(
                    "Counter drift on post {}: likes {} -> {}, comments {} -> {}",
                    post_id, like_count, actual_likes, comment_count, actual_comments
                );

                self.db.query_with_params(
                    "UPDATE type::thing('post', $post_id) SET like_count = $likes, comment_count = $comments",
                    json!({
                        "post_id": post_id,
                        "likes": actual_likes,
                        "comments": actual_comments,
                    }),
                ).await?;

                repaired += 1;
            }
        }

        if repaired > 0 {
            info!("Reconciled counters on {} posts", repaired);
        }

        Ok(())
    }
}

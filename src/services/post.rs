use crate::{
    error::{AppError, Result},
    models::post::{AuthorInfo, CreatePostRequest, Post, PostWithViewerState},
    services::auth::User,
    services::{Database, EngagementService},
    utils::{sanitize::sanitize_text, validation::validate_text_content},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

#[derive(Clone)]
pub struct PostService {
    db: Arc<Database>,
    engagement_service: EngagementService,
}

impl PostService {
    pub async fn new(db: Arc<Database>, engagement_service: EngagementService) -> Result<Self> {
        Ok(Self { db, engagement_service })
    }

    /// 发布帖子。正文与出处署名先清洗再校验；计数器从零开始，
    /// 此后只由切换/评论路径修改
    pub async fn create_post(&self, author_id: &str, request: CreatePostRequest) -> Result<Post> {
        debug!("User {} publishing a {:?} post", author_id, request.kind);

        request.validate().map_err(AppError::ValidatorError)?;

        let content = validate_text_content(
            &sanitize_text(&request.content),
            self.db.config.max_post_length,
            "帖子内容",
        )?;

        let attribution = match &request.attribution {
            Some(raw) => {
                let cleaned = sanitize_text(raw);
                let trimmed = cleaned.trim();
                if trimmed.is_empty() {
                    None
                } else if trimmed.chars().count() > self.db.config.max_attribution_length {
                    return Err(AppError::Validation("出处署名过长".to_string()));
                } else {
                    Some(trimmed.to_string())
                }
            }
            None => None,
        };

        let post = Post::new(Some(author_id.to_string()), content, attribution, request.kind);
        self.db.create("post", &post.id, &post).await?;

        info!("Post {} published by {}", post.id, author_id);
        Ok(post)
    }

    /// 获取单个帖子（带观看者状态）
    pub async fn get_post(&self, post_id: &str, viewer_id: Option<&str>) -> Result<PostWithViewerState> {
        let post: Post = self
            .db
            .get_by_id("post", post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        let (is_liked, is_saved) = match viewer_id {
            Some(uid) => (
                self.engagement_service.is_member("like", uid, post_id).await?,
                self.engagement_service.is_member("save", uid, post_id).await?,
            ),
            None => (false, false),
        };

        let author = match &post.author_id {
            Some(author_id) => self.fetch_author_info(author_id).await?,
            None => None,
        };

        Ok(PostWithViewerState {
            post,
            author,
            is_liked,
            is_saved,
        })
    }

    /// 删除帖子：仅作者或管理员；点赞/收藏/评论行随帖子同事务删除
    pub async fn delete_post(&self, post_id: &str, user: &User) -> Result<()> {
        let post: Post = self
            .db
            .get_by_id("post", post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        let is_author = post.author_id.as_deref() == Some(user.id.as_str());
        if !is_author && !user.is_admin() {
            return Err(AppError::forbidden("You can only delete your own posts"));
        }

        self.db.query_with_params(
            "BEGIN TRANSACTION; \
             DELETE type::thing('post', $post_id); \
             DELETE like WHERE post_id = $post_id; \
             DELETE save WHERE post_id = $post_id; \
             DELETE comment WHERE post_id = $post_id; \
             COMMIT TRANSACTION;",
            json!({ "post_id": post_id }),
        ).await?;

        info!("Post {} deleted by {}", post_id, user.id);
        Ok(())
    }

    async fn fetch_author_info(&self, author_id: &str) -> Result<Option<AuthorInfo>> {
        let mut response = self.db.query_with_params(
            "SELECT user_id, username, display_name, avatar_url FROM user_profile WHERE user_id = $user_id",
            json!({ "user_id": author_id }),
        ).await?;

        let infos: Vec<AuthorInfo> = response.take(0)?;
        Ok(infos.into_iter().next())
    }
}

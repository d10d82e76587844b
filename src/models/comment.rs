use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// 评论树节点：同级按创建时间升序，replies 递归嵌套，深度不限
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<crate::models::post::AuthorInfo>,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub parent_id: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
}

impl Comment {
    pub fn new(post_id: String, author_id: String, parent_id: Option<String>, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            post_id,
            author_id,
            parent_id,
            content,
            created_at: Utc::now(),
        }
    }
}

impl CommentNode {
    /// 新评论作为空 replies 的叶子返回，客户端可直接拼接进已有树
    pub fn leaf(comment: Comment, author: Option<crate::models::post::AuthorInfo>) -> Self {
        Self {
            comment,
            author,
            replies: Vec::new(),
        }
    }

    /// 该节点及其全部后代的数量
    pub fn size(&self) -> usize {
        1 + self.replies.iter().map(|r| r.size()).sum::<usize>()
    }
}

use crate::{
    error::{AppError, Result},
    models::comment::{Comment, CommentNode, CreateCommentRequest},
    models::post::{AuthorInfo, Post},
    services::auth::User,
    services::Database,
    utils::{sanitize::sanitize_text, validation::validate_text_content},
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

#[derive(Clone)]
pub struct CommentService {
    db: Arc<Database>,
}

impl CommentService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 创建评论：插入行与 comment_count += 1 在同一事务内。
    /// parent_id 必须指向同一帖子下的评论，防止跨帖串线
    pub async fn create_comment(
        &self,
        user_id: &str,
        request: CreateCommentRequest,
    ) -> Result<CommentNode> {
        debug!("Creating comment on post: {}", request.post_id);

        request.validate().map_err(AppError::ValidatorError)?;

        let content = validate_text_content(
            &sanitize_text(&request.content),
            self.db.config.max_comment_length,
            "评论内容",
        )?;

        let post: Option<Post> = self.db.get_by_id("post", &request.post_id).await?;
        if post.is_none() {
            return Err(AppError::not_found("Post"));
        }

        if let Some(parent_id) = &request.parent_id {
            let parent: Comment = self
                .db
                .get_by_id("comment", parent_id)
                .await?
                .ok_or_else(|| AppError::not_found("Parent comment"))?;

            if parent.post_id != request.post_id {
                return Err(AppError::Validation(
                    "Parent comment belongs to a different post".to_string(),
                ));
            }
        }

        let comment = Comment::new(
            request.post_id.clone(),
            user_id.to_string(),
            request.parent_id.clone(),
            content,
        );

        let mut data = serde_json::to_value(&comment)?;
        if let Some(obj) = data.as_object_mut() {
            obj.remove("id");
        }

        self.db.query_with_params(
            "BEGIN TRANSACTION; \
             CREATE type::thing('comment', $id) CONTENT $data; \
             UPDATE type::thing('post', $post_id) SET comment_count += 1; \
             COMMIT TRANSACTION;",
            json!({
                "id": comment.id,
                "data": data,
                "post_id": request.post_id,
            }),
        ).await?;

        let author = self.fetch_author_infos(&[comment.author_id.clone()]).await?
            .remove(user_id);

        Ok(CommentNode::leaf(comment, author))
    }

    /// 获取帖子的评论树：单次升序查询，内存中重建层级。
    /// 父评论不在结果集中的评论按根级孤儿保留，重建绝不丢评论
    pub async fn get_comment_tree(&self, post_id: &str) -> Result<Vec<CommentNode>> {
        debug!("Building comment tree for post: {}", post_id);

        let mut response = self.db.query_with_params(
            "SELECT *, meta::id(id) AS id FROM comment \
             WHERE post_id = $post_id ORDER BY created_at ASC",
            json!({ "post_id": post_id }),
        ).await?;

        let comments: Vec<Comment> = response.take(0)?;

        let author_ids: Vec<String> = {
            let mut seen = HashSet::new();
            comments
                .iter()
                .filter(|c| seen.insert(c.author_id.clone()))
                .map(|c| c.author_id.clone())
                .collect()
        };
        let authors = self.fetch_author_infos(&author_ids).await?;

        Ok(Self::assemble_tree(comments, &authors))
    }

    /// 删除评论：仅作者或管理员；comment_count 减 1 与实际删除同事务配对。
    /// 不级联删除回复，其回复在下次读取时按根级孤儿出现
    pub async fn delete_comment(&self, comment_id: &str, user: &User) -> Result<()> {
        let comment: Comment = self
            .db
            .get_by_id("comment", comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))?;

        if comment.author_id != user.id && !user.is_admin() {
            return Err(AppError::forbidden("You can only delete your own comments"));
        }

        self.db.query_with_params(
            "BEGIN TRANSACTION; \
             LET $gone = (DELETE type::thing('comment', $id) RETURN BEFORE); \
             IF array::len($gone) > 0 THEN \
                 (UPDATE type::thing('post', $post_id) SET comment_count -= 1 WHERE comment_count > 0) \
             END; \
             COMMIT TRANSACTION;",
            json!({
                "id": comment_id,
                "post_id": comment.post_id,
            }),
        ).await?;

        debug!("Comment {} deleted by {}", comment_id, user.id);
        Ok(())
    }

    /// 扁平行 → 树。两遍：先按 parent_id 建子表，再从根递归装配；
    /// 根与每层 replies 都保持创建时间升序（入参已升序，桶保序）
    fn assemble_tree(comments: Vec<Comment>, authors: &HashMap<String, AuthorInfo>) -> Vec<CommentNode> {
        let ids: HashSet<String> = comments.iter().map(|c| c.id.clone()).collect();

        let mut children: HashMap<String, Vec<Comment>> = HashMap::new();
        let mut roots: Vec<Comment> = Vec::new();

        for comment in comments {
            match &comment.parent_id {
                Some(parent) if *parent != comment.id && ids.contains(parent) => {
                    children.entry(parent.clone()).or_default().push(comment);
                }
                _ => roots.push(comment),
            }
        }

        roots
            .into_iter()
            .map(|c| Self::attach_replies(c, &mut children, authors))
            .collect()
    }

    fn attach_replies(
        comment: Comment,
        children: &mut HashMap<String, Vec<Comment>>,
        authors: &HashMap<String, AuthorInfo>,
    ) -> CommentNode {
        let replies = children
            .remove(&comment.id)
            .unwrap_or_default()
            .into_iter()
            .map(|c| Self::attach_replies(c, children, authors))
            .collect();

        let author = authors.get(&comment.author_id).cloned();

        CommentNode {
            comment,
            author,
            replies,
        }
    }

    async fn fetch_author_infos(&self, author_ids: &[String]) -> Result<HashMap<String, AuthorInfo>> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut response = self.db.query_with_params(
            "SELECT user_id, username, display_name, avatar_url FROM user_profile WHERE user_id IN $ids",
            json!({ "ids": author_ids }),
        ).await?;

        let infos: Vec<AuthorInfo> = response.take(0)?;
        Ok(infos.into_iter().map(|a| (a.user_id.clone(), a)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn comment(id: &str, parent: Option<&str>, minutes: i64) -> Comment {
        Comment {
            id: id.to_string(),
            post_id: "p1".to_string(),
            author_id: "u1".to_string(),
            parent_id: parent.map(String::from),
            content: format!("comment {}", id),
            created_at: Utc::now() + Duration::minutes(minutes),
        }
    }

    fn total_nodes(nodes: &[CommentNode]) -> usize {
        nodes.iter().map(|n| n.size()).sum()
    }

    #[test]
    fn test_assemble_nested_tree() {
        let comments = vec![
            comment("c1", None, 0),
            comment("c2", Some("c1"), 1),
            comment("c3", Some("c2"), 2),
            comment("c4", None, 3),
        ];

        let tree = CommentService::assemble_tree(comments, &HashMap::new());

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, "c1");
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].comment.id, "c2");
        // 深度不限：c3 嵌套在 c2 之下
        assert_eq!(tree[0].replies[0].replies[0].comment.id, "c3");
        assert_eq!(tree[1].comment.id, "c4");
    }

    #[test]
    fn test_orphan_becomes_root_not_dropped() {
        let comments = vec![
            comment("c1", None, 0),
            comment("c2", Some("c1"), 1),
            comment("c3", Some("nonexistent-id"), 2),
        ];

        let tree = CommentService::assemble_tree(comments, &HashMap::new());

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, "c1");
        assert_eq!(tree[0].replies[0].comment.id, "c2");
        assert_eq!(tree[1].comment.id, "c3");
        assert!(tree[1].replies.is_empty());
        assert_eq!(total_nodes(&tree), 3);
    }

    #[test]
    fn test_sibling_order_is_creation_ascending() {
        let comments = vec![
            comment("c1", None, 0),
            comment("c2", Some("c1"), 1),
            comment("c3", Some("c1"), 2),
            comment("c4", Some("c1"), 3),
        ];

        let tree = CommentService::assemble_tree(comments, &HashMap::new());

        let reply_ids: Vec<&str> = tree[0].replies.iter().map(|r| r.comment.id.as_str()).collect();
        assert_eq!(reply_ids, vec!["c2", "c3", "c4"]);
    }

    #[test]
    fn test_self_referencing_comment_survives_as_root() {
        let comments = vec![comment("c1", Some("c1"), 0)];

        let tree = CommentService::assemble_tree(comments, &HashMap::new());

        assert_eq!(tree.len(), 1);
        assert_eq!(total_nodes(&tree), 1);
    }

    #[test]
    fn test_empty_input_gives_empty_tree() {
        let tree = CommentService::assemble_tree(Vec::new(), &HashMap::new());
        assert!(tree.is_empty());
    }

    proptest! {
        /// 任意父引用组合下重建后的节点总数恒等于输入行数。
        /// 父评论只能先于子评论存在，指向未来/越界的引用按悬挂引用生成
        #[test]
        fn prop_tree_preserves_every_comment(parent_links in proptest::collection::vec(proptest::option::of(0usize..40), 1..40)) {
            let comments: Vec<Comment> = parent_links
                .iter()
                .enumerate()
                .map(|(i, parent)| {
                    let parent_id = parent.map(|p| {
                        if p < i {
                            format!("c{}", p)
                        } else {
                            format!("missing{}", p)
                        }
                    });
                    comment(&format!("c{}", i), parent_id.as_deref(), i as i64)
                })
                .collect();

            let count = comments.len();
            let tree = CommentService::assemble_tree(comments, &HashMap::new());

            prop_assert_eq!(total_nodes(&tree), count);
        }
    }
}

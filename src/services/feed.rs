use crate::{
    error::{AppError, Result},
    models::post::{AuthorInfo, FeedPage, Post, PostWithViewerState},
    services::{Database, EngagementService},
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Feed 排序策略。
///
/// 默认每次调用重新随机（每次访问都有新鲜感），代价是偏移分页在并发
/// 写入下可能跨页重复或跳过帖子；`Newest` 提供稳定排序作为替代
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingStrategy {
    FreshRandom,
    Newest,
}

impl RankingStrategy {
    pub fn from_config(value: &str) -> Self {
        match value {
            "newest" => Self::Newest,
            _ => Self::FreshRandom,
        }
    }

    fn order_clause(&self) -> &'static str {
        match self {
            Self::FreshRandom => "rand()",
            Self::Newest => "created_at DESC",
        }
    }
}

#[derive(Clone)]
pub struct FeedService {
    db: Arc<Database>,
    engagement_service: EngagementService,
    ranking: RankingStrategy,
    page_size: usize,
}

impl FeedService {
    pub async fn new(db: Arc<Database>, engagement_service: EngagementService) -> Result<Self> {
        let ranking = RankingStrategy::from_config(&db.config.feed_ranking);
        let page_size = db.config.posts_per_page;

        Ok(Self {
            db,
            engagement_service,
            ranking,
            page_size,
        })
    }

    /// 获取一页 feed。
    /// 多取一条来判断是否还有下一页；观看者状态用两次集合查询批量标注
    pub async fn get_feed_page(
        &self,
        viewer_id: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<FeedPage> {
        let offset = parse_cursor(cursor)?;
        debug!("Fetching feed page at offset {} (viewer: {:?})", offset, viewer_id);

        let sql = format!(
            "SELECT *, meta::id(id) AS id FROM post ORDER BY {} LIMIT $limit START $offset",
            self.ranking.order_clause()
        );

        let mut response = self.db.query_with_params(&sql, json!({
            "limit": self.page_size + 1,
            "offset": offset,
        })).await?;

        let fetched: Vec<Post> = response.take(0)?;
        let (posts, has_more, next_cursor) = page_window(fetched, offset, self.page_size);

        let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();

        let (liked, saved) = match viewer_id {
            Some(uid) => (
                self.engagement_service.liked_subset(uid, &post_ids).await?,
                self.engagement_service.saved_subset(uid, &post_ids).await?,
            ),
            None => (HashSet::new(), HashSet::new()),
        };

        let authors = self.fetch_author_infos(&posts).await?;

        let posts = posts
            .into_iter()
            .map(|post| {
                let author = post
                    .author_id
                    .as_ref()
                    .and_then(|id| authors.get(id).cloned());
                let is_liked = liked.contains(&post.id);
                let is_saved = saved.contains(&post.id);

                PostWithViewerState {
                    post,
                    author,
                    is_liked,
                    is_saved,
                }
            })
            .collect();

        Ok(FeedPage {
            posts,
            next_cursor,
            has_more,
        })
    }

    async fn fetch_author_infos(&self, posts: &[Post]) -> Result<HashMap<String, AuthorInfo>> {
        let author_ids: Vec<&str> = {
            let mut seen = HashSet::new();
            posts
                .iter()
                .filter_map(|p| p.author_id.as_deref())
                .filter(|id| seen.insert(*id))
                .collect()
        };

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

/// 解析偏移游标：缺省为 0，非数字或带符号的输入拒绝
fn parse_cursor(cursor: Option<&str>) -> Result<usize> {
    match cursor {
        None => Ok(0),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
                return Err(AppError::Validation("Invalid cursor".to_string()));
            }
            trimmed
                .parse::<usize>()
                .map_err(|_| AppError::Validation("Invalid cursor".to_string()))
        }
    }
}

/// 截断多取的一条并推导分页标志
fn page_window<T>(mut fetched: Vec<T>, offset: usize, page_size: usize) -> (Vec<T>, bool, Option<usize>) {
    if fetched.len() > page_size {
        fetched.truncate(page_size);
        (fetched, true, Some(offset + page_size))
    } else {
        (fetched, false, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cursor() {
        assert_eq!(parse_cursor(None).unwrap(), 0);
        assert_eq!(parse_cursor(Some("0")).unwrap(), 0);
        assert_eq!(parse_cursor(Some("40")).unwrap(), 40);

        assert!(parse_cursor(Some("")).is_err());
        assert!(parse_cursor(Some("abc")).is_err());
        assert!(parse_cursor(Some("-20")).is_err());
        assert!(parse_cursor(Some("1.5")).is_err());
        assert!(parse_cursor(Some("+3")).is_err());
    }

    #[test]
    fn test_page_window_full_page_with_more() {
        let fetched: Vec<i32> = (0..21).collect();
        let (page, has_more, next) = page_window(fetched, 0, 20);

        assert_eq!(page.len(), 20);
        assert!(has_more);
        assert_eq!(next, Some(20));
    }

    #[test]
    fn test_page_window_partial_last_page() {
        let fetched: Vec<i32> = (0..7).collect();
        let (page, has_more, next) = page_window(fetched, 40, 20);

        assert_eq!(page.len(), 7);
        assert!(!has_more);
        assert_eq!(next, None);
    }

    #[test]
    fn test_page_window_exact_boundary() {
        // 恰好一整页且没有第 21 条：没有下一页
        let fetched: Vec<i32> = (0..20).collect();
        let (page, has_more, next) = page_window(fetched, 20, 20);

        assert_eq!(page.len(), 20);
        assert!(!has_more);
        assert_eq!(next, None);
    }

    #[test]
    fn test_page_window_cursor_advances_by_page_size() {
        let fetched: Vec<i32> = (0..21).collect();
        let (_, _, next) = page_window(fetched, 60, 20);
        assert_eq!(next, Some(80));
    }

    #[test]
    fn test_ranking_strategy_from_config() {
        assert_eq!(RankingStrategy::from_config("newest"), RankingStrategy::Newest);
        assert_eq!(RankingStrategy::from_config("random"), RankingStrategy::FreshRandom);
        // 未知取值回落到默认随机排序
        assert_eq!(RankingStrategy::from_config("whatever"), RankingStrategy::FreshRandom);
    }
}

use crate::{
    config::Config,
    services::{
        auth::AuthService,
        comment::CommentService,
        database::Database,
        engagement::EngagementService,
        feed::FeedService,
        follow::FollowService,
        post::PostService,
        user::UserService,
    },
};

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 认证服务
    pub auth_service: AuthService,

    /// 用户资料服务
    pub user_service: UserService,

    /// 帖子服务
    pub post_service: PostService,

    /// Feed 服务
    pub feed_service: FeedService,

    /// 点赞/收藏切换服务
    pub engagement_service: EngagementService,

    /// 评论服务
    pub comment_service: CommentService,

    /// 关注服务
    pub follow_service: FollowService,
}

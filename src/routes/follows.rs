use crate::{
    error::Result,
    state::AppState,
    utils::middleware::{OptionalAuth, RequireAuth},
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct FollowQuery {
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/:user_id/follow", post(toggle_follow))
        .route("/user/:user_id/followers", get(get_followers))
        .route("/user/:user_id/following", get(get_following))
}

/// 切换关注状态
/// POST /api/verse/follows/user/:user_id/follow
async fn toggle_follow(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("User {} toggling follow on user {}", user.id, user_id);

    let result = state.follow_service.toggle_follow(&user.id, &user_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}

/// 获取用户的关注者列表
/// GET /api/verse/follows/user/:user_id/followers
async fn get_followers(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<FollowQuery>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let current_user_id = user.as_ref().map(|u| u.id.as_str());
    let followers = state
        .follow_service
        .get_followers(&user_id, current_user_id, query.page, query.limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": followers
    })))
}

/// 获取用户关注的人列表
/// GET /api/verse/follows/user/:user_id/following
async fn get_following(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<FollowQuery>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let current_user_id = user.as_ref().map(|u| u.id.as_str());
    let following = state
        .follow_service
        .get_following(&user_id, current_user_id, query.page, query.limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": following
    })))
}

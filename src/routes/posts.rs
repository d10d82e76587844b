use crate::{
    error::Result,
    models::post::CreatePostRequest,
    state::AppState,
    utils::middleware::{OptionalAuth, RequireAuth},
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_post))
        .route("/:id", get(get_post))
        .route("/:id", delete(delete_post))
        .route("/:id/like", post(toggle_like))
        .route("/:id/save", post(toggle_save))
}

/// 发布帖子
/// POST /api/verse/posts
async fn create_post(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<Value>> {
    let created = state.post_service.create_post(&user.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": created
    })))
}

/// 获取单个帖子（带观看者状态）
/// GET /api/verse/posts/:id
async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let viewer_id = user.as_ref().map(|u| u.id.as_str());
    let found = state.post_service.get_post(&post_id, viewer_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": found
    })))
}

/// 删除帖子
/// DELETE /api/verse/posts/:id
async fn delete_post(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    state.post_service.delete_post(&post_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Post deleted successfully"
    })))
}

/// 切换点赞
/// POST /api/verse/posts/:id/like
async fn toggle_like(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("User {} toggling like on post {}", user.id, post_id);

    let result = state.engagement_service.toggle_like(&user.id, &post_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}

/// 切换收藏
/// POST /api/verse/posts/:id/save
async fn toggle_save(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("User {} toggling save on post {}", user.id, post_id);

    let result = state.engagement_service.toggle_save(&user.id, &post_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}

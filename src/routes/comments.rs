use crate::{
    error::Result,
    models::comment::CreateCommentRequest,
    state::AppState,
    utils::middleware::RequireAuth,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/post/:post_id", get(get_comment_tree))
        .route("/", post(create_comment))
        .route("/:id", delete(delete_comment))
}

/// 获取帖子的评论树
/// GET /api/verse/comments/post/:post_id
async fn get_comment_tree(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    let tree = state.comment_service.get_comment_tree(&post_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": tree
    })))
}

/// 发表评论
/// POST /api/verse/comments
async fn create_comment(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateCommentRequest>,
) -> Result<Json<Value>> {
    let node = state.comment_service.create_comment(&user.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": node
    })))
}

/// 删除评论
/// DELETE /api/verse/comments/:id
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(comment_id): Path<String>,
) -> Result<Json<Value>> {
    state.comment_service.delete_comment(&comment_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Comment deleted successfully"
    })))
}

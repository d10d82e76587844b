use crate::{
    error::Result,
    models::user::{CreateUserProfileRequest, UpdateUserProfileRequest},
    state::AppState,
    utils::middleware::{OptionalAuth, RequireAuth},
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", post(complete_profile))
        .route("/profile", put(update_profile))
        .route("/:username", get(get_profile))
}

/// 资料补全（首次成功调用即建立正式用户档案）
/// POST /api/verse/users/profile
async fn complete_profile(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateUserProfileRequest>,
) -> Result<Json<Value>> {
    let profile = state.user_service.complete_profile(&user.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": profile
    })))
}

/// 更新资料
/// PUT /api/verse/users/profile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<UpdateUserProfileRequest>,
) -> Result<Json<Value>> {
    let profile = state.user_service.update_profile(&user.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": profile
    })))
}

/// 按用户名获取个人主页（计数实时统计）
/// GET /api/verse/users/:username
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let viewer_id = user.as_ref().map(|u| u.id.as_str());
    let profile = state.user_service.get_profile_view(&username, viewer_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": profile
    })))
}

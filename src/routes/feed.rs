use crate::{
    error::Result,
    models::post::FeedQuery,
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_feed))
}

/// 获取 feed 分页
/// GET /api/verse/feed?cursor=<offset>
async fn get_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let viewer_id = user.as_ref().map(|u| u.id.as_str());

    let page = state
        .feed_service
        .get_feed_page(viewer_id, query.cursor.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": page
    })))
}

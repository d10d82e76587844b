use crate::{error::AppError, state::AppState};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type KeyedRateLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;
static RATE_LIMITER: OnceCell<KeyedRateLimiter> = OnceCell::const_new();

/// 认证中间件：验证 Bearer JWT 并解析 Rainbow-Auth 用户；
/// 失败时请求继续以未认证身份处理，由各处理器决定是否拒绝
pub async fn auth_middleware(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    if let Some(auth_header) = headers.get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if auth_str.starts_with("Bearer ") {
                let token = &auth_str[7..];

                match app_state.auth_service.verify_jwt(token) {
                    Ok(claims) => {
                        match app_state.auth_service.resolve_user(&claims.sub, token).await {
                            Ok(user) => {
                                debug!("Authenticated user: {}", user.id);

                                // 确保用户的 profile 存在（首次访问时创建占位档案）
                                if let Err(e) = app_state
                                    .user_service
                                    .get_or_create_profile(&user.id, user.username.clone(), user.display_name.clone())
                                    .await
                                {
                                    warn!("Failed to ensure user profile exists for user {}: {}", user.id, e);
                                }

                                request.extensions_mut().insert(user);
                            }
                            Err(e) => {
                                warn!("Failed to resolve user from Rainbow-Auth: {}", e);
                            }
                        }
                    }
                    Err(e) => {
                        debug!("JWT verification failed: {}", e);
                    }
                }
            }
        }
    }

    Ok(next.run(request).await)
}

/// 速率限制中间件
pub async fn rate_limit_middleware(
    State(app_state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    let rate_limiter = RATE_LIMITER.get_or_init(|| async {
        let quota = Quota::per_minute(NonZeroU32::new(app_state.config.rate_limit_requests).unwrap())
            .allow_burst(NonZeroU32::new(10).unwrap());
        RateLimiter::dashmap(quota)
    }).await;

    let client_ip = get_client_ip(&request);

    match rate_limiter.check_key(&client_ip) {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            warn!("Rate limit exceeded for IP: {}", client_ip);
            Err(AppError::RateLimitExceeded)
        }
    }
}

/// 获取客户端 IP 地址（优先使用代理头）
fn get_client_ip(request: &Request<Body>) -> String {
    let headers = request.headers();

    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(ip_str) = forwarded_for.to_str() {
            if let Some(ip) = ip_str.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return ip_str.to_string();
        }
    }

    request
        .extensions()
        .get::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 可选认证提取器
pub struct OptionalAuth(pub Option<crate::services::auth::User>);

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<crate::services::auth::User>().cloned();
        Ok(OptionalAuth(user))
    }
}

/// 必须认证提取器：缺少身份时直接以 401 拒绝
pub struct RequireAuth(pub crate::services::auth::User);

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<crate::services::auth::User>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;
        Ok(RequireAuth(user))
    }
}

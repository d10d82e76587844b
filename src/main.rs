use std::sync::Arc;
use axum::{
    error_handling::HandleErrorLayer,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, Router},
    BoxError,
};
use rand::Rng;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing::{error, info, warn};
use tokio::time::{interval, Duration};

mod config;
mod error;
mod models;
mod routes;
mod services;
mod state;
mod utils;

use crate::{
    config::Config,
    error::AppError,
    state::AppState,
    services::{
        AuthService,
        CommentService,
        Database,
        EngagementService,
        FeedService,
        FollowService,
        PostService,
        UserService,
    },
    utils::middleware::{auth_middleware, rate_limit_middleware},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("LOG_LEVEL").unwrap_or_else(|_| "rainbow_verse=debug,tower_http=debug".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rainbow-Verse service...");

    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    if config.is_development() {
        warn!("Running in development mode");
    }

    // 初始化数据库连接
    let db = Arc::new(match Database::new(&config).await {
        Ok(db) => {
            match db.verify_connection().await {
                Ok(_) => {
                    info!("Database connection established successfully");
                    db
                }
                Err(e) => {
                    warn!("Database connection failed: {}", e);
                    info!("Attempting to auto-start database...");

                    // 尝试自动启动数据库
                    if let Err(start_err) = auto_start_database(&config).await {
                        error!("Failed to auto-start database: {}. Original error: {}", start_err, e);
                        return Err(anyhow::anyhow!("Database connection failed"));
                    }

                    // 重新尝试连接
                    let db = Database::new(&config).await?;
                    db.verify_connection().await?;
                    info!("Database auto-started and connected successfully");
                    db
                }
            }
        }
        Err(e) => {
            error!("Failed to create database connection: {}", e);
            return Err(anyhow::anyhow!("Database initialization failed"));
        }
    });

    // 初始化所有服务
    let auth_service = AuthService::new(&config).await?;
    let engagement_service = EngagementService::new(db.clone()).await?;
    let follow_service = FollowService::new(db.clone()).await?;
    let user_service = UserService::new(db.clone(), follow_service.clone()).await?;
    let post_service = PostService::new(db.clone(), engagement_service.clone()).await?;
    let feed_service = FeedService::new(db.clone(), engagement_service.clone()).await?;
    let comment_service = CommentService::new(db.clone()).await?;

    // 创建应用状态
    let app_state = Arc::new(AppState {
        config: config.clone(),
        auth_service,
        user_service,
        post_service,
        feed_service,
        engagement_service,
        comment_service,
        follow_service,
    });

    // 启动后台任务
    start_background_tasks(app_state.clone()).await;

    // 配置 CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(
            config.cors_allowed_origins
                .split(',')
                .map(|origin| origin.parse::<HeaderValue>().unwrap())
                .collect::<Vec<_>>(),
        );

    // 构建应用路由 - 使用/api/verse/前缀避免网关路由冲突
    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/verse/feed", routes::feed::router())
        .nest("/api/verse/posts", routes::posts::router())
        .nest("/api/verse/comments", routes::comments::router())
        .nest("/api/verse/users", routes::users::router())
        .nest("/api/verse/follows", routes::follows::router())
        .layer(middleware::from_fn_with_state(app_state.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(app_state.clone(), rate_limit_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(Duration::from_secs(config.request_timeout_secs)),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "Rainbow-Verse is running!"
}

/// 请求级超时等中间件错误映射为应用错误
async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::timeout("request exceeded deadline")
    } else {
        AppError::internal(&err.to_string())
    }
}

async fn auto_start_database(config: &Config) -> anyhow::Result<()> {
    info!("Attempting to start SurrealDB...");

    // 尝试启动 SurrealDB 进程
    let output = tokio::process::Command::new("surreal")
        .args(&[
            "start",
            "--user", &config.database_username,
            "--pass", &config.database_password,
            "memory",
        ])
        .spawn();

    match output {
        Ok(_) => {
            info!("SurrealDB started successfully");
            // 等待数据库启动
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(())
        }
        Err(e) => {
            error!("Failed to start SurrealDB: {}", e);
            Err(anyhow::anyhow!("Failed to start database"))
        }
    }
}

async fn start_background_tasks(app_state: Arc<AppState>) {
    info!("Starting background tasks...");

    // 计数器校对任务：定期用成员行重算反规范化计数，修复漂移
    let reconcile_state = app_state.clone();
    tokio::spawn(async move {
        let jitter = {
            let mut rng = rand::thread_rng();
            rng.gen_range(0..60)
        };
        let mut interval = interval(Duration::from_secs(
            reconcile_state.config.counter_reconcile_interval + jitter
        ));

        loop {
            interval.tick().await;
            if let Err(e) = reconcile_state.engagement_service.reconcile_counters().await {
                error!("Failed to reconcile counters: {}", e);
            }
        }
    });

    info!("Background tasks started successfully");
}

use crate::config::Config;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Debug;
use std::future::IntoFuture;
use std::time::Duration;
use surrealdb::engine::remote::http::{Client, Http};
use surrealdb::opt::auth::Root;
use surrealdb::{Response, Surreal};
use tracing::{error, info};

/// 数据库服务
///
/// 所有调用都带有受限的超时：超过期限返回 `Timeout`，与存储本身的
/// 故障（`ServiceUnavailable`/`Database`）区分开
#[derive(Clone)]
pub struct Database {
    client: Surreal<Client>,
    timeout: Duration,
    pub config: Config,
}

impl Database {
    /// 创建新的数据库实例
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing database connection to {}", config.database_url);

        let endpoint = config
            .database_url
            .trim_start_matches("http://")
            .trim_start_matches("https://");

        let client = Surreal::new::<Http>(endpoint)
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("Failed to reach database: {}", e)))?;

        client
            .signin(Root {
                username: &config.database_username,
                password: &config.database_password,
            })
            .await?;

        client
            .use_ns(&config.database_namespace)
            .use_db(&config.database_name)
            .await?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(config.database_timeout_secs),
            config: config.clone(),
        })
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match self.run(self.client.query("INFO FOR DB")).await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(e)
            }
        }
    }

    /// 执行原始SQL查询
    pub async fn query(&self, sql: &str) -> Result<Response> {
        self.run(self.client.query(sql)).await
    }

    /// 执行带参数的查询
    pub async fn query_with_params<P>(&self, sql: &str, params: P) -> Result<Response>
    where
        P: Serialize,
    {
        self.run(self.client.query(sql).bind(params)).await
    }

    /// 创建记录，记录ID取 `type::thing(table, id)`。
    /// CONTENT 中的 id 字段会与记录ID冲突，写入前剥掉
    pub async fn create<T>(&self, table: &str, id: &str, data: &T) -> Result<()>
    where
        T: Serialize + Sync + Debug,
    {
        let mut content = serde_json::to_value(data)?;
        if let Some(obj) = content.as_object_mut() {
            obj.remove("id");
        }

        self.query_with_params(
            "CREATE type::thing($tb, $id) CONTENT $content",
            json!({ "tb": table, "id": id, "content": content }),
        )
        .await?;

        Ok(())
    }

    /// 通过ID获取单个记录
    pub async fn get_by_id<T>(&self, table: &str, id: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        let mut response = self
            .query_with_params(
                "SELECT *, meta::id(id) AS id FROM type::thing($tb, $id)",
                json!({ "tb": table, "id": id }),
            )
            .await?;

        let results: Vec<T> = response.take(0)?;
        Ok(results.into_iter().next())
    }

    /// 通过ID删除记录
    pub async fn delete_by_id(&self, table: &str, id: &str) -> Result<()> {
        self.query_with_params(
            "DELETE type::thing($tb, $id)",
            json!({ "tb": table, "id": id }),
        )
        .await?;
        Ok(())
    }

    /// 执行聚合计数查询；SQL 必须形如 `SELECT count() AS count FROM ... GROUP ALL`
    pub async fn count<P>(&self, sql: &str, params: P) -> Result<i64>
    where
        P: Serialize,
    {
        let mut response = self.query_with_params(sql, params).await?;
        let rows: Vec<serde_json::Value> = response.take(0)?;

        Ok(rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    /// 统一的执行入口：超时界定 + 语句级错误分类
    async fn run<F>(&self, fut: F) -> Result<Response>
    where
        F: IntoFuture<Output = surrealdb::Result<Response>>,
    {
        match tokio::time::timeout(self.timeout, fut.into_future()).await {
            Ok(Ok(response)) => response.check().map_err(classify_db_error),
            Ok(Err(e)) => Err(classify_db_error(e)),
            Err(_) => Err(AppError::timeout("database query exceeded deadline")),
        }
    }
}

/// 将存储错误映射到应用错误分类:
/// 记录已存在 → Conflict（调用方按无操作切换处理）；
/// 读写冲突 → TransactionConflict（整个操作可重试）
fn classify_db_error(err: surrealdb::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("already exists") {
        AppError::Conflict(msg)
    } else if msg.contains("conflict") || msg.contains("retry") {
        AppError::TransactionConflict(msg)
    } else {
        AppError::Database(err)
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use dbhelper::{
    params, DbDriver, DbHelper, DbHelperError, DbPool, FileTemplateStore, HelperConfig, Params,
    SqlLoader,
};
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::EnvFilter;

const DDL: &str = "CREATE TABLE IF NOT EXISTS sensor_location (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    delete_flag INTEGER NOT NULL DEFAULT 0
)";

fn load_config() -> HelperConfig {
    match HelperConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "falling back to in-memory database");
            HelperConfig {
                database_url: "sqlite::memory:".to_string(),
                sql_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("sql"),
                ..Default::default()
            }
        }
    }
}

/// 示例只建 SQLite 表，其他数据库直接报错
fn ensure_sqlite(url: &str) -> anyhow::Result<()> {
    let driver = DbDriver::from_url(url)?;
    if driver != DbDriver::Sqlite {
        anyhow::bail!(
            "sqlite-demo only supports sqlite urls, DATABASE_URL points to {:?}",
            driver
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,dbhelper=debug")),
        )
        .init();

    let config = load_config();
    ensure_sqlite(&config.database_url)?;

    // 内存库只能共用一个连接
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(&config.database_url)
        .await?;
    sqlx::query(DDL).execute(&pool).await?;

    let store = FileTemplateStore::new(&config.sql_dir).with_extension(config.sql_extension.clone());
    let helper = DbHelper::new(DbPool::from_sqlite_pool(Arc::new(pool)), SqlLoader::new(store))
        .with_param_style(config.param_style());

    // ========== 1. 插入 ==========
    for i in 1..=25 {
        let name = format!("room-{:02}", i);
        if helper
            .execute_create("sensor_location", &params! { "location_name" => name }, None)
            .await?
            .is_none()
        {
            anyhow::bail!("insert failed, see log for details");
        }
    }

    // ========== 2. 更新 + 逻辑删除 ==========
    let updated = helper
        .execute_update(
            "sensor_location",
            &params! { "location_name" => "lobby" },
            &params! { "id" => 1 },
            None,
        )
        .await?;
    tracing::info!(?updated, "renamed first location");

    let deleted = helper
        .execute_delete("sensor_location", &params! { "id" => 2 }, true, None)
        .await?;
    tracing::info!(?deleted, "soft deleted second location");

    // ========== 3. 事务：闭包出错时全部回滚 ==========
    let result = dbhelper::transaction!(helper, |tx| async move {
        tx.try_execute_create("sensor_location", &params! { "location_name" => "temp" })
            .await?;
        tx.try_execute_update("missing_table", &params! { "x" => 1 }, &Params::new())
            .await?;
        Ok::<_, DbHelperError>(())
    })
    .await;
    if let Err(e) = result {
        tracing::info!(error = %e, "transaction rolled back");
    }

    // ========== 4. 分页查询 ==========
    let rows = helper
        .select_all(
            "home.index.query_sensor_location_by_id",
            &params! { "id" => 1 },
            &params! { "id" => true, "pageNum" => 2, "pageSize" => 10 },
            None,
        )
        .await?;
    let total = helper
        .select_one("home.index.count_sensor_location", &Params::new(), &Params::new(), None)
        .await?;

    let output = serde_json::json!({
        "total": total.get("total"),
        "location_name": rows,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use dbhelper::{
    params, BindValue, DbHelper, DbHelperError, DbPool, HelperConfig, MemoryTemplateStore, ParamStyle,
    Params, SqlLoader,
};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

const LIST_USERS: &str = "SELECT id, name, age FROM users WHERE delete_flag = 0\
{{#if name}} AND name = :name{{/if}} ORDER BY id\
{{#if pageSize}} LIMIT {{pageSize}} OFFSET {{page_offset pageNum pageSize}}{{/if}}";

fn templates() -> MemoryTemplateStore {
    MemoryTemplateStore::new()
        .with_template("home.users.list", LIST_USERS)
        .with_template(
            "home.users.by_id",
            "SELECT id, name, age, score, delete_flag FROM users WHERE id = :id",
        )
        .with_template("home.users.count", "SELECT COUNT(*) AS total FROM users")
        .with_template("home.users.broken", "SELECT * FROM no_such_table")
        .with_template("home.users.bad_syntax", "SELECT 1 {{#if x}}")
}

async fn memory_pool(ddl: &str) -> DbPool {
    // 内存库每个连接独立，只保留一个连接
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query(ddl).execute(&pool).await.unwrap();
    DbPool::from_sqlite_pool(Arc::new(pool))
}

async fn helper() -> DbHelper {
    let pool = memory_pool(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            age INTEGER,
            score REAL,
            delete_flag INTEGER NOT NULL DEFAULT 0
        )",
    )
    .await;
    DbHelper::new(pool, SqlLoader::new(templates()))
}

async fn seed(helper: &DbHelper, names: &[&str]) -> Vec<i64> {
    let mut ids = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let id = helper
            .execute_create("users", &params! { "name" => *name, "age" => 20 + i as i64 }, None)
            .await
            .unwrap()
            .expect("insert should succeed");
        ids.push(id);
    }
    ids
}

async fn count(helper: &DbHelper) -> i64 {
    let row = helper
        .select_one("home.users.count", &Params::new(), &Params::new(), None)
        .await
        .unwrap();
    row["total"].as_i64().unwrap()
}

#[tokio::test]
async fn test_create_returns_new_ids_and_rows_keep_column_order() {
    let helper = helper().await;
    let ids = seed(&helper, &["alice", "bob"]).await;
    assert_eq!(ids, vec![1, 2]);

    let row = helper
        .select_one("home.users.by_id", &params! { "id" => 2 }, &Params::new(), None)
        .await
        .unwrap();
    assert_eq!(
        row.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["id", "name", "age", "score", "delete_flag"]
    );
    assert_eq!(row["name"], json!("bob"));
    assert_eq!(row["age"], json!(21));
    assert_eq!(row["score"], json!(null));
}

#[tokio::test]
async fn test_update_with_same_column_in_data_and_filter() {
    let helper = helper().await;
    seed(&helper, &["alice", "bob", "alice"]).await;

    let affected = helper
        .execute_update(
            "users",
            &params! { "name" => "carol", "score" => 9.5 },
            &params! { "name" => "alice" },
            None,
        )
        .await
        .unwrap();
    assert_eq!(affected, Some(2));

    let rows = helper
        .select_all("home.users.list", &params! { "name" => "carol" }, &params! { "name" => true }, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let row = helper
        .select_one("home.users.by_id", &params! { "id" => 1 }, &Params::new(), None)
        .await
        .unwrap();
    assert_eq!(row["score"], json!(9.5));
}

#[tokio::test]
async fn test_logical_and_hard_delete() {
    let helper = helper().await;
    seed(&helper, &["a", "b", "c"]).await;

    let affected = helper
        .execute_delete("users", &params! { "id" => 1 }, true, None)
        .await
        .unwrap();
    assert_eq!(affected, Some(1));
    let row = helper
        .select_one("home.users.by_id", &params! { "id" => 1 }, &Params::new(), None)
        .await
        .unwrap();
    assert_eq!(row["delete_flag"], json!(1));
    assert_eq!(count(&helper).await, 3);

    let affected = helper
        .execute_delete("users", &params! { "id" => 2 }, false, None)
        .await
        .unwrap();
    assert_eq!(affected, Some(1));
    assert_eq!(count(&helper).await, 2);

    // 空条件会删除全部
    let affected = helper
        .execute_delete("users", &Params::new(), false, None)
        .await
        .unwrap();
    assert_eq!(affected, Some(2));
    assert_eq!(count(&helper).await, 0);
}

#[tokio::test]
async fn test_null_values_round_trip() {
    let helper = helper().await;
    let id = helper
        .execute_create(
            "users",
            &params! { "name" => "nobody", "age" => BindValue::Null, "score" => 1.5 },
            None,
        )
        .await
        .unwrap()
        .expect("insert should succeed");

    let row = helper
        .select_one("home.users.by_id", &params! { "id" => id }, &Params::new(), None)
        .await
        .unwrap();
    assert_eq!(row["age"], json!(null));
    assert_eq!(row["score"], json!(1.5));

    let affected = helper
        .execute_update(
            "users",
            &params! { "score" => BindValue::Null, "age" => Option::<i64>::Some(40) },
            &params! { "id" => id },
            None,
        )
        .await
        .unwrap();
    assert_eq!(affected, Some(1));

    let row = helper
        .select_one("home.users.by_id", &params! { "id" => id }, &Params::new(), None)
        .await
        .unwrap();
    assert_eq!(row["age"], json!(40));
    assert_eq!(row["score"], json!(null));
}

#[tokio::test]
async fn test_huge_page_number_returns_empty_page() {
    let helper = helper().await;
    seed(&helper, &["a", "b"]).await;

    let page = helper
        .try_execute_sql(
            "home.users.list",
            &Params::new(),
            &params! { "pageNum" => i64::MAX, "pageSize" => 2 },
            None,
        )
        .await
        .unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_pagination_and_select_one_strips_it() {
    let helper = helper().await;
    seed(&helper, &["a", "b", "c", "d", "e"]).await;

    let page = helper
        .select_all(
            "home.users.list",
            &Params::new(),
            &params! { "pageNum" => 2, "pageSize" => 2 },
            None,
        )
        .await
        .unwrap();
    let ids: Vec<i64> = page.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![3, 4]);

    let first = helper
        .select_one(
            "home.users.list",
            &Params::new(),
            &params! { "pageNum" => 3, "pageSize" => 1 },
            None,
        )
        .await
        .unwrap();
    assert_eq!(first["id"], json!(1));
}

#[tokio::test]
async fn test_select_one_without_rows_returns_empty_map() {
    let helper = helper().await;
    let row = helper
        .select_one("home.users.by_id", &params! { "id" => 42 }, &Params::new(), None)
        .await
        .unwrap();
    assert!(row.is_empty());
}

#[tokio::test]
async fn test_execution_errors_become_sentinels() {
    let helper = helper().await;

    let rows = helper
        .execute_sql("home.users.broken", &Params::new(), &Params::new(), None)
        .await
        .unwrap();
    assert!(rows.is_empty());

    let id = helper
        .execute_create("no_such_table", &params! { "a" => 1 }, None)
        .await
        .unwrap();
    assert_eq!(id, None);

    let affected = helper
        .execute_update("no_such_table", &params! { "a" => 1 }, &params! { "id" => 1 }, None)
        .await
        .unwrap();
    assert_eq!(affected, None);

    // 缺少绑定参数同样属于执行期错误
    let rows = helper
        .execute_sql("home.users.by_id", &Params::new(), &Params::new(), None)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_try_variants_surface_execution_errors() {
    let helper = helper().await;

    let err = helper
        .try_execute_sql("home.users.broken", &Params::new(), &Params::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbHelperError::DatabaseError(_)));

    let err = helper
        .session(None)
        .unwrap()
        .try_select_one("home.users.by_id", &Params::new(), &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbHelperError::MissingParam(ref name) if name == "id"));

    // 没有数据时 try 形式返回 Ok(空)，可以和失败区分
    let rows = helper
        .try_execute_sql("home.users.list", &Params::new(), &Params::new(), None)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_template_and_validation_errors_are_not_swallowed() {
    let helper = helper().await;

    let err = helper
        .execute_sql("home.users.missing", &Params::new(), &Params::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbHelperError::TemplateNotFound(_)));

    let err = helper
        .select_all("home.users.bad_syntax", &Params::new(), &Params::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbHelperError::TemplateSyntax { .. }));

    let err = helper
        .execute_update(
            "users",
            &params! { "name" => "x" },
            &params! { "_where_id" => 1 },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbHelperError::Validation(_)));

    let err = helper
        .execute_create("users", &params! { "_where_name" => "x" }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbHelperError::Validation(_)));
}

#[tokio::test]
async fn test_transaction_commits() {
    let helper = helper().await;

    let ids = helper
        .with_transaction(None, |tx| {
            Box::pin(async move {
                let a = tx.try_execute_create("users", &params! { "name" => "a" }).await?;
                let b = tx.try_execute_create("users", &params! { "name" => "b" }).await?;
                let rows = tx
                    .try_select_all("home.users.list", &Params::new(), &Params::new())
                    .await?;
                assert_eq!(rows.len(), 2);
                Ok::<_, DbHelperError>((a, b))
            })
        })
        .await
        .unwrap();
    assert_eq!(ids, (Some(1), Some(2)));
    assert_eq!(count(&helper).await, 2);
}

#[tokio::test]
async fn test_transaction_rolls_back_all_writes_on_error() {
    let helper = helper().await;
    seed(&helper, &["keep"]).await;

    let result = helper
        .with_transaction(None, |tx| {
            Box::pin(async move {
                tx.try_execute_create("users", &params! { "name" => "a" }).await?;
                tx.try_execute_update("users", &params! { "name" => "changed" }, &Params::new())
                    .await?;
                tx.try_execute_create("no_such_table", &params! { "x" => 1 })
                    .await?;
                Ok::<_, DbHelperError>(())
            })
        })
        .await;
    assert!(matches!(result, Err(DbHelperError::DatabaseError(_))));

    assert_eq!(count(&helper).await, 1);
    let row = helper
        .select_one("home.users.by_id", &params! { "id" => 1 }, &Params::new(), None)
        .await
        .unwrap();
    assert_eq!(row["name"], json!("keep"));
}

#[tokio::test]
async fn test_transaction_macro_and_manual_rollback() {
    let helper = helper().await;

    let id = dbhelper::transaction!(helper, |tx| async move {
        let id = tx.try_execute_create("users", &params! { "name" => "macro" }).await?;
        Ok::<_, DbHelperError>(id)
    })
    .await
    .unwrap();
    assert_eq!(id, Some(1));

    let mut tx = helper.begin(None).await.unwrap();
    tx.try_execute_delete("users", &params! { "id" => 1 }, false)
        .await
        .unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(count(&helper).await, 1);
}

#[tokio::test]
async fn test_bind_routing() {
    let archive = memory_pool("CREATE TABLE archive_log (id INTEGER PRIMARY KEY, note TEXT)").await;
    let helper = helper().await.with_bind("archive", archive);

    let id = helper
        .execute_create("archive_log", &params! { "note" => "moved" }, Some("archive"))
        .await
        .unwrap();
    assert_eq!(id, Some(1));

    // 默认库没有这张表
    let id = helper
        .execute_create("archive_log", &params! { "note" => "moved" }, None)
        .await
        .unwrap();
    assert_eq!(id, None);

    let err = helper
        .execute_create("archive_log", &params! { "note" => "x" }, Some("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbHelperError::UnknownBind(ref name) if name == "nope"));
}

#[tokio::test]
async fn test_sharp_column_names() {
    let ddl = "CREATE TABLE flags (id INTEGER PRIMARY KEY, \"del#flag\" INTEGER)";

    let relaxed = DbHelper::new(memory_pool(ddl).await, SqlLoader::new(templates()));
    let id = relaxed
        .execute_create("flags", &params! { "del#flag" => 1 }, None)
        .await
        .unwrap();
    assert_eq!(id, Some(1));

    let strict = DbHelper::new(memory_pool(ddl).await, SqlLoader::new(templates()))
        .with_param_style(ParamStyle { allow_sharp: false });
    let id = strict
        .execute_create("flags", &params! { "del#flag" => 1 }, None)
        .await
        .unwrap();
    assert_eq!(id, None);
}

#[tokio::test]
async fn test_connect_from_config_with_file_templates() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("misc")).unwrap();
    std::fs::write(
        dir.path().join("misc").join("probe.sql"),
        "-- name: one\nSELECT 1 AS one, 'x' AS label\n\n-- name: two\nSELECT 2 AS two\n",
    )
    .unwrap();

    let mut config = HelperConfig {
        database_url: "sqlite::memory:".to_string(),
        sql_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    config
        .binds
        .insert("archive".to_string(), "sqlite::memory:".to_string());

    let helper = DbHelper::connect(&config).await.unwrap();
    let row = helper
        .select_one("misc.probe.one", &Params::new(), &Params::new(), None)
        .await
        .unwrap();
    assert_eq!(json!(row), json!({"one": 1, "label": "x"}));

    let rows = helper
        .select_all("misc.probe.two", &Params::new(), &Params::new(), Some("archive"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

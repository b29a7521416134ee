use async_trait::async_trait;
use sqlx::{Database, Encode, Type};

use crate::bind_value::BindValue;
use crate::db_pool::{DbDriver, DbPool};
use crate::error::{DbHelperError, Result};
use crate::row::ResultSet;

/// 写操作结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteResult {
    pub rows_affected: u64,
    /// 自增 ID（MySQL `last_insert_id` / SQLite `last_insert_rowid`），PostgreSQL 为 None
    pub last_insert_id: Option<i64>,
}

/// 数据库执行器 trait，统一连接池和事务的接口
///
/// SQL 已经是驱动占位符形式，`binds` 按占位符顺序排列。
///
/// 注意：此 trait 要求 `Send`，因为异步方法需要在不同线程之间传递 Future
#[async_trait]
pub trait DbExecutor: Send {
    /// 获取驱动类型
    fn driver(&self) -> DbDriver;

    /// 执行 INSERT / UPDATE / DELETE
    async fn execute(&mut self, sql: &str, binds: &[BindValue]) -> Result<WriteResult>;

    /// 执行查询并把每一行转换为有序映射
    async fn fetch_all(&mut self, sql: &str, binds: &[BindValue]) -> Result<ResultSet>;
}

/// 按顺序把绑定值应用到查询中
pub(crate) fn apply_binds<'q, DB>(
    mut query: sqlx::query::Query<'q, DB, DB::Arguments<'q>>,
    binds: &[BindValue],
) -> sqlx::query::Query<'q, DB, DB::Arguments<'q>>
where
    DB: Database,
    String: Type<DB> + Encode<'q, DB>,
    i64: Type<DB> + Encode<'q, DB>,
    i32: Type<DB> + Encode<'q, DB>,
    i16: Type<DB> + Encode<'q, DB>,
    f64: Type<DB> + Encode<'q, DB>,
    f32: Type<DB> + Encode<'q, DB>,
    bool: Type<DB> + Encode<'q, DB>,
    Vec<u8>: Type<DB> + Encode<'q, DB>,
    Option<String>: Type<DB> + Encode<'q, DB>,
{
    for bind in binds {
        query = match bind.clone() {
            BindValue::String(s) => query.bind(s),
            BindValue::Int64(i) => query.bind(i),
            BindValue::Int32(i) => query.bind(i),
            BindValue::Int16(i) => query.bind(i),
            BindValue::Float64(f) => query.bind(f),
            BindValue::Float32(f) => query.bind(f),
            BindValue::Bool(b) => query.bind(b),
            BindValue::Bytes(b) => query.bind(b),
            BindValue::Null => query.bind(Option::<String>::None),
        };
    }
    query
}

/// 宏：在给定的 sqlx 执行器上执行写操作
macro_rules! run_write {
    ($executor:expr, $sql:expr, $binds:expr, |$result:ident| $last_id:expr) => {{
        let $result = $crate::executor::apply_binds(sqlx::query($sql), $binds)
            .execute($executor)
            .await?;
        Ok($crate::executor::WriteResult {
            rows_affected: $result.rows_affected(),
            last_insert_id: $last_id,
        })
    }};
}

/// 宏：在给定的 sqlx 执行器上执行查询并转换结果行
macro_rules! run_fetch {
    ($executor:expr, $sql:expr, $binds:expr, $convert:path) => {{
        let rows = $crate::executor::apply_binds(sqlx::query($sql), $binds)
            .fetch_all($executor)
            .await?;
        Ok(rows.iter().map($convert).collect())
    }};
}

pub(crate) use run_fetch;
pub(crate) use run_write;

#[async_trait]
impl<'p> DbExecutor for &'p DbPool {
    fn driver(&self) -> DbDriver {
        DbPool::driver(self)
    }

    async fn execute(&mut self, sql: &str, binds: &[BindValue]) -> Result<WriteResult> {
        match DbPool::driver(self) {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql_pool().ok_or(DbHelperError::NoPoolAvailable)?;
                run_write!(pool, sql, binds, |r| Some(r.last_insert_id() as i64))
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg_pool().ok_or(DbHelperError::NoPoolAvailable)?;
                run_write!(pool, sql, binds, |_r| None)
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite_pool().ok_or(DbHelperError::NoPoolAvailable)?;
                run_write!(pool, sql, binds, |r| Some(r.last_insert_rowid()))
            }
            #[allow(unreachable_patterns)]
            _ => Err(DbHelperError::NoPoolAvailable),
        }
    }

    async fn fetch_all(&mut self, sql: &str, binds: &[BindValue]) -> Result<ResultSet> {
        match DbPool::driver(self) {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql_pool().ok_or(DbHelperError::NoPoolAvailable)?;
                run_fetch!(pool, sql, binds, crate::row::mysql_row)
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg_pool().ok_or(DbHelperError::NoPoolAvailable)?;
                run_fetch!(pool, sql, binds, crate::row::postgres_row)
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite_pool().ok_or(DbHelperError::NoPoolAvailable)?;
                run_fetch!(pool, sql, binds, crate::row::sqlite_row)
            }
            #[allow(unreachable_patterns)]
            _ => Err(DbHelperError::NoPoolAvailable),
        }
    }
}

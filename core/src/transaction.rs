use async_trait::async_trait;

use crate::bind_value::BindValue;
use crate::db_pool::{DbDriver, DbPool};
use crate::error::{DbHelperError, Result};
use crate::executor::{run_fetch, run_write, DbExecutor, WriteResult};
use crate::row::ResultSet;

/// 宏：简化事务闭包的写法，自动处理 `Box::pin`
///
/// 使用示例：
/// ```ignore
/// // 默认数据库
/// dbhelper::transaction!(helper, |tx| async move {
///     tx.try_execute_create("user", &params).await?;
///     Ok::<_, dbhelper::DbHelperError>(())
/// }).await?;
///
/// // 指定 bind
/// dbhelper::transaction!(helper, bind = "report", |tx| async move {
///     Ok::<_, dbhelper::DbHelperError>(42)
/// }).await?;
/// ```
#[macro_export]
macro_rules! transaction {
    ($helper:expr, bind = $bind:expr, |$tx:ident| async move $body:block) => {
        $helper.with_transaction(Some($bind), |$tx| Box::pin(async move $body))
    };
    ($helper:expr, |$tx:ident| async move $body:block) => {
        $helper.with_transaction(None, |$tx| Box::pin(async move $body))
    };
}

/// 数据库事务包装器
#[derive(Debug)]
pub enum Transaction<'tx> {
    #[cfg(feature = "mysql")]
    MySql(sqlx::Transaction<'tx, sqlx::MySql>),
    #[cfg(feature = "postgres")]
    Postgres(sqlx::Transaction<'tx, sqlx::Postgres>),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::Transaction<'tx, sqlx::Sqlite>),
}

impl<'tx> Transaction<'tx> {
    /// 获取事务的驱动类型
    pub fn driver(&self) -> DbDriver {
        match self {
            #[cfg(feature = "mysql")]
            Transaction::MySql(_) => DbDriver::MySql,
            #[cfg(feature = "postgres")]
            Transaction::Postgres(_) => DbDriver::Postgres,
            #[cfg(feature = "sqlite")]
            Transaction::Sqlite(_) => DbDriver::Sqlite,
        }
    }

    /// 提交事务
    pub async fn commit(self) -> Result<()> {
        match self {
            #[cfg(feature = "mysql")]
            Transaction::MySql(tx) => tx.commit().await?,
            #[cfg(feature = "postgres")]
            Transaction::Postgres(tx) => tx.commit().await?,
            #[cfg(feature = "sqlite")]
            Transaction::Sqlite(tx) => tx.commit().await?,
        }
        Ok(())
    }

    /// 回滚事务
    pub async fn rollback(self) -> Result<()> {
        match self {
            #[cfg(feature = "mysql")]
            Transaction::MySql(tx) => tx.rollback().await?,
            #[cfg(feature = "postgres")]
            Transaction::Postgres(tx) => tx.rollback().await?,
            #[cfg(feature = "sqlite")]
            Transaction::Sqlite(tx) => tx.rollback().await?,
        }
        Ok(())
    }
}

#[async_trait]
impl DbExecutor for Transaction<'static> {
    fn driver(&self) -> DbDriver {
        Transaction::driver(self)
    }

    async fn execute(&mut self, sql: &str, binds: &[BindValue]) -> Result<WriteResult> {
        match self {
            #[cfg(feature = "mysql")]
            Transaction::MySql(tx) => {
                run_write!(&mut **tx, sql, binds, |r| Some(r.last_insert_id() as i64))
            }
            #[cfg(feature = "postgres")]
            Transaction::Postgres(tx) => run_write!(&mut **tx, sql, binds, |_r| None),
            #[cfg(feature = "sqlite")]
            Transaction::Sqlite(tx) => {
                run_write!(&mut **tx, sql, binds, |r| Some(r.last_insert_rowid()))
            }
        }
    }

    async fn fetch_all(&mut self, sql: &str, binds: &[BindValue]) -> Result<ResultSet> {
        match self {
            #[cfg(feature = "mysql")]
            Transaction::MySql(tx) => run_fetch!(&mut **tx, sql, binds, crate::row::mysql_row),
            #[cfg(feature = "postgres")]
            Transaction::Postgres(tx) => {
                run_fetch!(&mut **tx, sql, binds, crate::row::postgres_row)
            }
            #[cfg(feature = "sqlite")]
            Transaction::Sqlite(tx) => run_fetch!(&mut **tx, sql, binds, crate::row::sqlite_row),
        }
    }
}

impl DbPool {
    /// 开始一个事务
    pub async fn begin(&self) -> Result<Transaction<'static>> {
        match self.driver() {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql_pool().ok_or(DbHelperError::NoPoolAvailable)?;
                Ok(Transaction::MySql(pool.begin().await?))
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg_pool().ok_or(DbHelperError::NoPoolAvailable)?;
                Ok(Transaction::Postgres(pool.begin().await?))
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite_pool().ok_or(DbHelperError::NoPoolAvailable)?;
                Ok(Transaction::Sqlite(pool.begin().await?))
            }
            #[allow(unreachable_patterns)]
            _ => Err(DbHelperError::NoPoolAvailable),
        }
    }
}

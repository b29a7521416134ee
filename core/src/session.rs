//! 执行门面
//!
//! [`Session`] 把语句构建、模板加载、命名参数编译和执行串起来，
//! 同一套方法既可以跑在连接池上（[`PoolSession`]），也可以跑在事务里（[`TxSession`]）。
//!
//! 每个操作都有两种形式：
//! - `try_*`：任何错误都返回 `Err`
//! - 兼容形式：执行期错误（驱动报错、缺少参数）记录日志后返回哨兵值，
//!   写操作返回 `Ok(None)`，读操作返回空结果；校验和模板错误仍然返回 `Err`。
//!   这种形式下读操作无法区分"没有数据"和"查询失败"，需要区分时请用 `try_*`。

use crate::bind_value::Params;
use crate::builder::{build_delete, build_insert, build_update, RenderedStatement};
use crate::db_pool::{DbDriver, DbPool};
use crate::error::{DbHelperError, Result};
use crate::executor::{DbExecutor, WriteResult};
use crate::named_params::ParamStyle;
use crate::row::{ResultRow, ResultSet};
use crate::template::{strip_pagination, SqlLoader};
use crate::transaction::Transaction;

/// 连接池上的会话
pub type PoolSession<'p> = Session<&'p DbPool>;
/// 事务中的会话
pub type TxSession = Session<Transaction<'static>>;

pub struct Session<E> {
    loader: SqlLoader,
    style: ParamStyle,
    executor: E,
}

fn log_failure(sql: &str, params: &Params, err: &DbHelperError) {
    tracing::error!(sql, params = ?params, error = %err, "failed to execute sql");
}

/// 执行期错误转换为哨兵值，其余错误继续返回
fn swallow<T>(result: Result<T>, sentinel: T, sql: &str, params: &Params) -> Result<T> {
    match result {
        Ok(v) => Ok(v),
        Err(e) if e.is_execution_error() => {
            log_failure(sql, params, &e);
            Ok(sentinel)
        }
        Err(e) => Err(e),
    }
}

impl<E: DbExecutor> Session<E> {
    pub(crate) fn new(loader: SqlLoader, style: ParamStyle, executor: E) -> Self {
        Self {
            loader,
            style,
            executor,
        }
    }

    pub fn driver(&self) -> DbDriver {
        self.executor.driver()
    }

    /// 执行已经生成好的写语句
    pub async fn try_execute(&mut self, statement: &RenderedStatement) -> Result<WriteResult> {
        let compiled = self
            .style
            .compile(statement.sql(), statement.params(), self.driver())?;
        tracing::debug!(sql = %compiled.sql, params = ?statement.params(), "execute");
        self.executor.execute(&compiled.sql, &compiled.binds).await
    }

    /// 执行写语句，失败时记录 SQL 和参数并返回 None
    pub async fn execute_write(&mut self, statement: &RenderedStatement) -> Option<WriteResult> {
        match self.try_execute(statement).await {
            Ok(result) => Some(result),
            Err(e) => {
                log_failure(statement.sql(), statement.params(), &e);
                None
            }
        }
    }

    /// 更新数据，返回影响行数
    pub async fn try_execute_update(
        &mut self,
        table: &str,
        data: &Params,
        filter: &Params,
    ) -> Result<u64> {
        let statement = build_update(table, data, filter)?;
        Ok(self.try_execute(&statement).await?.rows_affected)
    }

    /// 更新数据；执行失败返回 `Ok(None)`
    pub async fn execute_update(
        &mut self,
        table: &str,
        data: &Params,
        filter: &Params,
    ) -> Result<Option<u64>> {
        let statement = build_update(table, data, filter)?;
        Ok(self
            .execute_write(&statement)
            .await
            .map(|r| r.rows_affected))
    }

    /// 插入数据，返回新记录的 ID
    ///
    /// PostgreSQL 没有通用的自增 ID，插入成功时返回 `Ok(None)`；
    /// 需要 ID 时请在模板中使用 `RETURNING` 并调用 [`Session::try_execute_sql`]。
    pub async fn try_execute_create(
        &mut self,
        table: &str,
        data: &Params,
    ) -> Result<Option<i64>> {
        let statement = build_insert(self.driver(), table, data)?;
        Ok(self.try_execute(&statement).await?.last_insert_id)
    }

    /// 插入数据；执行失败返回 `Ok(None)`
    ///
    /// `None` 已经表示失败，所以 PostgreSQL 上插入成功时返回 `Some(0)`。
    pub async fn execute_create(&mut self, table: &str, data: &Params) -> Result<Option<i64>> {
        let statement = build_insert(self.driver(), table, data)?;
        Ok(self
            .execute_write(&statement)
            .await
            .map(|r| r.last_insert_id.unwrap_or(0)))
    }

    /// 删除数据（`logical` 为逻辑删除），返回影响行数
    pub async fn try_execute_delete(
        &mut self,
        table: &str,
        filter: &Params,
        logical: bool,
    ) -> Result<u64> {
        let statement = build_delete(table, filter, logical)?;
        Ok(self.try_execute(&statement).await?.rows_affected)
    }

    /// 删除数据；执行失败返回 `Ok(None)`
    pub async fn execute_delete(
        &mut self,
        table: &str,
        filter: &Params,
        logical: bool,
    ) -> Result<Option<u64>> {
        let statement = build_delete(table, filter, logical)?;
        Ok(self
            .execute_write(&statement)
            .await
            .map(|r| r.rows_affected))
    }

    async fn fetch(&mut self, sql: &str, params: &Params) -> Result<ResultSet> {
        let compiled = self.style.compile(sql, params, self.driver())?;
        tracing::debug!(sql = %compiled.sql, params = ?params, "query");
        self.executor.fetch_all(&compiled.sql, &compiled.binds).await
    }

    /// 动态 SQL 查询
    ///
    /// `params` 是绑定参数，`options` 控制模板中的动态片段（包括分页）。
    pub async fn try_execute_sql(
        &mut self,
        query_id: &str,
        params: &Params,
        options: &Params,
    ) -> Result<ResultSet> {
        let sql = self.loader.preload_sql(query_id, options)?;
        self.fetch(&sql, params).await
    }

    /// 动态 SQL 查询；执行失败返回空结果
    pub async fn execute_sql(
        &mut self,
        query_id: &str,
        params: &Params,
        options: &Params,
    ) -> Result<ResultSet> {
        let sql = self.loader.preload_sql(query_id, options)?;
        let result = self.fetch(&sql, params).await;
        swallow(result, Vec::new(), &sql, params)
    }

    /// 查询单条记录，忽略分页参数；没有数据时返回空映射
    pub async fn try_select_one(
        &mut self,
        query_id: &str,
        params: &Params,
        options: &Params,
    ) -> Result<ResultRow> {
        let options = strip_pagination(options);
        let rows = self.try_execute_sql(query_id, params, &options).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    /// 查询单条记录；执行失败同样返回空映射
    pub async fn select_one(
        &mut self,
        query_id: &str,
        params: &Params,
        options: &Params,
    ) -> Result<ResultRow> {
        let options = strip_pagination(options);
        let rows = self.execute_sql(query_id, params, &options).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    /// 查询多条记录，`options` 中的 `pageNum`/`pageSize` 生效
    pub async fn try_select_all(
        &mut self,
        query_id: &str,
        params: &Params,
        options: &Params,
    ) -> Result<ResultSet> {
        self.try_execute_sql(query_id, params, options).await
    }

    /// 查询多条记录；执行失败返回空结果
    pub async fn select_all(
        &mut self,
        query_id: &str,
        params: &Params,
        options: &Params,
    ) -> Result<ResultSet> {
        self.execute_sql(query_id, params, options).await
    }
}

impl TxSession {
    /// 提交事务
    pub async fn commit(self) -> Result<()> {
        self.executor.commit().await
    }

    /// 手动回滚事务
    pub async fn rollback(self) -> Result<()> {
        self.executor.rollback().await
    }
}

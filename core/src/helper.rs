//! 数据库操作入口
//!
//! [`DbHelper`] 在启动时构造一次（连接池 + 模板加载器 + 参数规则），之后只读共享，
//! 通过 `Arc<DbHelper>` 或引用传给各个请求处理函数。
//!
//! 所有方法都接受可选的 `bind`，用于多数据库场景下指定目标库；为 None 时使用默认库。

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::bind_value::Params;
use crate::config::HelperConfig;
use crate::db_pool::DbPool;
use crate::error::{DbHelperError, Result};
use crate::named_params::ParamStyle;
use crate::row::{ResultRow, ResultSet};
use crate::session::{PoolSession, Session, TxSession};
use crate::template::{FileTemplateStore, SqlLoader};

#[derive(Debug, Clone)]
pub struct DbHelper {
    default: DbPool,
    binds: HashMap<String, DbPool>,
    loader: SqlLoader,
    style: ParamStyle,
}

impl DbHelper {
    pub fn new(pool: DbPool, loader: SqlLoader) -> Self {
        Self {
            default: pool,
            binds: HashMap::new(),
            loader,
            style: ParamStyle::default(),
        }
    }

    /// 注册一个额外的数据库
    pub fn with_bind(mut self, name: impl Into<String>, pool: DbPool) -> Self {
        self.binds.insert(name.into(), pool);
        self
    }

    pub fn with_param_style(mut self, style: ParamStyle) -> Self {
        self.style = style;
        self
    }

    /// 按配置连接所有数据库并创建基于目录的模板加载器
    pub async fn connect(config: &HelperConfig) -> Result<Self> {
        let pool = DbPool::connect(&config.database_url).await?;
        let store =
            FileTemplateStore::new(&config.sql_dir).with_extension(config.sql_extension.clone());
        let mut helper =
            DbHelper::new(pool, SqlLoader::new(store)).with_param_style(config.param_style());
        for (name, url) in &config.binds {
            tracing::info!(bind = %name, "connecting database bind");
            helper = helper.with_bind(name.clone(), DbPool::connect(url).await?);
        }
        Ok(helper)
    }

    pub fn loader(&self) -> &SqlLoader {
        &self.loader
    }

    /// 按 bind 名选择连接池
    pub fn pool(&self, bind: Option<&str>) -> Result<&DbPool> {
        match bind {
            None => Ok(&self.default),
            Some(name) => self
                .binds
                .get(name)
                .ok_or_else(|| DbHelperError::UnknownBind(name.to_string())),
        }
    }

    /// 连接池会话，可以调用全部 `try_*` 方法
    pub fn session(&self, bind: Option<&str>) -> Result<PoolSession<'_>> {
        Ok(Session::new(
            self.loader.clone(),
            self.style,
            self.pool(bind)?,
        ))
    }

    /// 手动开启事务，需要自行 `commit` 或 `rollback`
    pub async fn begin(&self, bind: Option<&str>) -> Result<TxSession> {
        let tx = self.pool(bind)?.begin().await?;
        Ok(Session::new(self.loader.clone(), self.style, tx))
    }

    /// 在事务中执行闭包
    ///
    /// 闭包返回 Ok 则提交，返回 Err 则回滚并原样返回该错误。
    ///
    /// ```ignore
    /// helper.with_transaction(None, |tx| {
    ///     Box::pin(async move {
    ///         tx.try_execute_update("user", &data, &filter).await?;
    ///         Ok::<_, DbHelperError>(())
    ///     })
    /// }).await?;
    /// ```
    pub async fn with_transaction<F, T, E>(
        &self,
        bind: Option<&str>,
        f: F,
    ) -> std::result::Result<T, E>
    where
        for<'a> F: FnOnce(
            &'a mut TxSession,
        ) -> Pin<Box<dyn Future<Output = std::result::Result<T, E>> + Send + 'a>>,
        E: From<DbHelperError>,
    {
        let mut tx = self.begin(bind).await.map_err(E::from)?;

        match f(&mut tx).await {
            Ok(result) => {
                tx.commit().await.map_err(E::from)?;
                Ok(result)
            }
            Err(e) => {
                // 回滚失败只记录，返回闭包的原始错误
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "failed to rollback transaction");
                }
                Err(e)
            }
        }
    }

    /// 更新数据；执行失败返回 `Ok(None)`
    pub async fn execute_update(
        &self,
        table: &str,
        data: &Params,
        filter: &Params,
        bind: Option<&str>,
    ) -> Result<Option<u64>> {
        self.session(bind)?.execute_update(table, data, filter).await
    }

    /// 插入数据，返回新记录 ID；执行失败返回 `Ok(None)`
    ///
    /// PostgreSQL 没有通用的自增 ID，插入成功时返回 `Some(0)`；
    /// 需要区分时请用 `session(bind)?.try_execute_create`，它在 PostgreSQL 上返回 `Ok(None)`。
    pub async fn execute_create(
        &self,
        table: &str,
        data: &Params,
        bind: Option<&str>,
    ) -> Result<Option<i64>> {
        self.session(bind)?.execute_create(table, data).await
    }

    /// 删除数据；执行失败返回 `Ok(None)`
    pub async fn execute_delete(
        &self,
        table: &str,
        filter: &Params,
        logical: bool,
        bind: Option<&str>,
    ) -> Result<Option<u64>> {
        self.session(bind)?
            .execute_delete(table, filter, logical)
            .await
    }

    /// 动态 SQL 查询；执行失败返回空结果
    pub async fn execute_sql(
        &self,
        query_id: &str,
        params: &Params,
        options: &Params,
        bind: Option<&str>,
    ) -> Result<ResultSet> {
        self.session(bind)?
            .execute_sql(query_id, params, options)
            .await
    }

    /// 动态 SQL 查询，执行失败返回错误
    pub async fn try_execute_sql(
        &self,
        query_id: &str,
        params: &Params,
        options: &Params,
        bind: Option<&str>,
    ) -> Result<ResultSet> {
        self.session(bind)?
            .try_execute_sql(query_id, params, options)
            .await
    }

    /// 查询单条记录（忽略分页）；没有数据或执行失败时返回空映射
    pub async fn select_one(
        &self,
        query_id: &str,
        params: &Params,
        options: &Params,
        bind: Option<&str>,
    ) -> Result<ResultRow> {
        self.session(bind)?
            .select_one(query_id, params, options)
            .await
    }

    /// 查询多条记录（支持分页）；执行失败返回空结果
    pub async fn select_all(
        &self,
        query_id: &str,
        params: &Params,
        options: &Params,
        bind: Option<&str>,
    ) -> Result<ResultSet> {
        self.session(bind)?
            .select_all(query_id, params, options)
            .await
    }
}

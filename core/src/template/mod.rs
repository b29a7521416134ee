//! 动态 SQL 模板加载
//!
//! 查询 ID 形如 `domain.file.query_name`，由 [`TemplateStore`] 取出模板源码，
//! 再交给 [`SqlRenderer`] 根据 options 渲染出最终 SQL（仍然带 `:name` 命名参数）。

pub mod renderer;
pub mod store;

pub use renderer::{HandlebarsRenderer, SqlRenderer};
pub use store::{FileTemplateStore, MemoryTemplateStore, TemplateStore};

use std::fmt;
use std::sync::Arc;

use crate::bind_value::Params;
use crate::error::{DbHelperError, Result};

/// 分页参数：页码
pub const PAGE_NUM: &str = "pageNum";
/// 分页参数：每页条数
pub const PAGE_SIZE: &str = "pageSize";

/// 去掉分页参数，用于只取单条记录的查询
pub fn strip_pagination(options: &Params) -> Params {
    let mut options = options.clone();
    options.remove(PAGE_NUM);
    options.remove(PAGE_SIZE);
    options
}

/// 点分查询 ID
///
/// 至少两段：最后一段是查询名，倒数第二段是文件名，前面的都是目录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryId {
    raw: String,
    segments: Vec<String>,
}

impl QueryId {
    pub fn parse(raw: &str) -> Result<Self> {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        let valid_segment = |s: &String| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        };
        if segments.len() < 2 || !segments.iter().all(valid_segment) {
            return Err(DbHelperError::TemplateNotFound(format!(
                "invalid query id '{}', expected 'domain.file.query'",
                raw
            )));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 目录部分
    pub fn dirs(&self) -> &[String] {
        &self.segments[..self.segments.len() - 2]
    }

    pub fn file(&self) -> &str {
        &self.segments[self.segments.len() - 2]
    }

    pub fn name(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// SQL 模板加载器
#[derive(Clone)]
pub struct SqlLoader {
    store: Arc<dyn TemplateStore>,
    renderer: Arc<dyn SqlRenderer>,
}

impl SqlLoader {
    /// 使用 handlebars 渲染器
    pub fn new(store: impl TemplateStore + 'static) -> Self {
        Self::with_renderer(store, HandlebarsRenderer::new())
    }

    pub fn with_renderer(
        store: impl TemplateStore + 'static,
        renderer: impl SqlRenderer + 'static,
    ) -> Self {
        Self {
            store: Arc::new(store),
            renderer: Arc::new(renderer),
        }
    }

    /// 解析查询 ID 并渲染模板，返回带命名参数的 SQL
    pub fn preload_sql(&self, query_id: &str, options: &Params) -> Result<String> {
        let id = QueryId::parse(query_id)?;
        let source = self.store.load(&id)?;
        let sql = self
            .renderer
            .render(id.as_str(), &source, &options.to_json())?;
        tracing::trace!(query_id, sql = %sql, "rendered sql template");
        Ok(sql)
    }
}

impl fmt::Debug for SqlLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlLoader").finish_non_exhaustive()
    }
}

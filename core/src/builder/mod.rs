//! 语句构建模块
//!
//! 根据表名 + 数据 + 条件生成参数化的 INSERT / UPDATE / DELETE，不拼接任何值。
//!
//! WHERE 条件的参数统一改名为 `_where_<列名>` 后再与数据合并，
//! 这样同一列同时出现在 SET 和 WHERE 且取值不同也不会冲突。

pub mod delete_builder;
pub mod insert_builder;
pub mod update_builder;

pub use delete_builder::{build_delete, SOFT_DELETE_COLUMN};
pub use insert_builder::build_insert;
pub use update_builder::build_update;

use crate::bind_value::Params;
use crate::error::{DbHelperError, Result};

/// WHERE 条件参数使用的保留前缀
pub const WHERE_PREFIX: &str = "_where_";

/// 生成好的语句：SQL 文本 + 命名参数
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStatement {
    sql: String,
    params: Params,
}

impl RenderedStatement {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn into_parts(self) -> (String, Params) {
        (self.sql, self.params)
    }
}

/// WHERE 条件列对应的参数名
pub fn where_param_name(column: &str) -> String {
    format!("{}{}", WHERE_PREFIX, column)
}

/// 把条件表转换到 `_where_` 命名空间
pub fn tag_filter(filter: &Params) -> Params {
    filter
        .iter()
        .map(|(k, v)| (where_param_name(k), v.clone()))
        .collect()
}

/// 生成 ` WHERE a = :_where_a AND b = :_where_b`，条件为空时返回空串
fn where_clause(filter: &Params) -> String {
    if filter.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = filter
        .keys()
        .map(|k| format!("{} = :{}", k, where_param_name(k)))
        .collect();
    format!(" WHERE {}", parts.join(" AND "))
}

fn check_table(table: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(DbHelperError::Validation(
            "table name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn check_reserved(kind: &str, params: &Params) -> Result<()> {
    if let Some(key) = params.keys().find(|k| k.starts_with(WHERE_PREFIX)) {
        return Err(DbHelperError::Validation(format!(
            "{} key '{}' must not start with reserved prefix '{}'",
            kind, key, WHERE_PREFIX
        )));
    }
    Ok(())
}

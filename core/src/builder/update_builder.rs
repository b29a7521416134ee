//! Update 语句构建

use super::{check_reserved, check_table, tag_filter, where_clause, RenderedStatement};
use crate::bind_value::Params;
use crate::error::{DbHelperError, Result};

/// 构建 UPDATE 语句
///
/// 生成 `UPDATE <table> SET c1 = :c1, c2 = :c2 WHERE f1 = :_where_f1 AND ...`。
/// `filter` 为空时不生成 WHERE，即更新全表，由调用方负责。
pub fn build_update(table: &str, data: &Params, filter: &Params) -> Result<RenderedStatement> {
    check_table(table)?;
    check_reserved("data", data)?;
    check_reserved("filter", filter)?;
    if data.is_empty() {
        return Err(DbHelperError::Validation(
            "update requires at least one column".to_string(),
        ));
    }

    let set_parts: Vec<String> = data.keys().map(|k| format!("{} = :{}", k, k)).collect();
    let sql = format!(
        "UPDATE {} SET {}{}",
        table,
        set_parts.join(", "),
        where_clause(filter)
    );

    let mut params = data.clone();
    params.extend(tag_filter(filter));
    Ok(RenderedStatement::new(sql, params))
}

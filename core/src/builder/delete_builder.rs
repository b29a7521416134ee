//! Delete 语句构建

use super::{check_reserved, check_table, tag_filter, where_clause, RenderedStatement};
use crate::bind_value::Params;
use crate::error::Result;

/// 逻辑删除标记列
pub const SOFT_DELETE_COLUMN: &str = "delete_flag";

/// 构建 DELETE 语句
///
/// `logical` 为 true 时生成 `UPDATE <table> SET delete_flag = 1 ...`（逻辑删除），
/// 否则生成物理删除。条件参数与 update 一样改名为 `_where_<列名>`。
/// `filter` 为空时不生成 WHERE。
pub fn build_delete(table: &str, filter: &Params, logical: bool) -> Result<RenderedStatement> {
    check_table(table)?;
    check_reserved("filter", filter)?;

    let head = if logical {
        format!("UPDATE {} SET {} = 1", table, SOFT_DELETE_COLUMN)
    } else {
        format!("DELETE FROM {}", table)
    };
    let sql = format!("{}{}", head, where_clause(filter));
    Ok(RenderedStatement::new(sql, tag_filter(filter)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind_value::BindValue;
    use crate::error::DbHelperError;
    use crate::params;

    #[test]
    fn test_hard_delete() {
        let stmt = build_delete("users", &params! { "id" => 5 }, false).unwrap();
        assert_eq!(stmt.sql(), "DELETE FROM users WHERE id = :_where_id");
        assert_eq!(stmt.params(), &params! { "_where_id" => 5 });
    }

    #[test]
    fn test_logical_delete_never_hard_deletes() {
        let stmt = build_delete("users", &params! { "id" => 5 }, true).unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE users SET delete_flag = 1 WHERE id = :_where_id"
        );
        assert!(!stmt.sql().contains("DELETE FROM"));
        assert_eq!(stmt.params().get("_where_id"), Some(&BindValue::Int32(5)));
    }

    #[test]
    fn test_empty_filter_is_unconditional() {
        let stmt = build_delete("logs", &Params::new(), false).unwrap();
        assert_eq!(stmt.sql(), "DELETE FROM logs");
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_reserved_prefix_rejected() {
        assert!(matches!(
            build_delete("t", &params! { "_where_id" => 1 }, false),
            Err(DbHelperError::Validation(_))
        ));
    }
}

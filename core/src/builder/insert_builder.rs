//! Insert 语句构建

use super::{check_reserved, check_table, RenderedStatement};
use crate::bind_value::Params;
use crate::db_pool::DbDriver;
use crate::error::{DbHelperError, Result};

/// 构建 INSERT 语句
///
/// 列名按驱动转义（MySQL 反引号，PostgreSQL/SQLite 双引号），
/// 参数名与列名相同，因此列名中带 `#` 时需要开启 `allow_sharp`。
pub fn build_insert(driver: DbDriver, table: &str, data: &Params) -> Result<RenderedStatement> {
    check_table(table)?;
    check_reserved("data", data)?;
    if data.is_empty() {
        return Err(DbHelperError::Validation(
            "insert requires at least one column".to_string(),
        ));
    }

    let columns: Vec<String> = data.keys().map(|k| driver.escape_identifier(k)).collect();
    let values: Vec<String> = data.keys().map(|k| format!(":{}", k)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        values.join(", ")
    );
    Ok(RenderedStatement::new(sql, data.clone()))
}

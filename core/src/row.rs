//! 查询结果行转换：驱动原生行 -> 有序 JSON 映射（key 为列名）

use serde_json::{Number, Value};
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo, ValueRef};

/// 单行结果，保持列顺序
pub type ResultRow = serde_json::Map<String, Value>;
/// 结果集
pub type ResultSet = Vec<ResultRow>;

/// 驱动特有类型的解码钩子，返回 None 表示交给通用逻辑
type ExtraDecoder<R> = fn(&R, usize, &str) -> Option<Value>;

const INT_TYPES: &[&str] = &[
    "TINYINT", "SMALLINT", "MEDIUMINT", "INT", "INTEGER", "BIGINT", "INT2", "INT4", "INT8",
    "SERIAL", "SMALLSERIAL", "BIGSERIAL", "YEAR",
];
const FLOAT_TYPES: &[&str] = &["FLOAT", "DOUBLE", "REAL", "FLOAT4", "FLOAT8", "DOUBLE PRECISION"];
const BOOL_TYPES: &[&str] = &["BOOL", "BOOLEAN"];
const BLOB_TYPES: &[&str] = &[
    "BLOB", "TINYBLOB", "MEDIUMBLOB", "LONGBLOB", "BYTEA", "BINARY", "VARBINARY",
];
const JSON_TYPES: &[&str] = &["JSON", "JSONB"];

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn bytes_value(b: Vec<u8>) -> Value {
    Value::String(String::from_utf8_lossy(&b).into_owned())
}

/// 16 字节 -> `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`
#[cfg(any(feature = "postgres", test))]
fn format_uuid(bytes: &[u8]) -> Option<String> {
    if bytes.len() != 16 {
        return None;
    }
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    Some(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

/// 把一行转换为 [`ResultRow`]
fn row_to_map<R>(row: &R, extra: ExtraDecoder<R>) -> ResultRow
where
    R: Row,
    usize: ColumnIndex<R>,
    i64: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    i32: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    i16: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    f64: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    f32: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    bool: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    String: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    Vec<u8>: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    Value: Type<R::Database> + for<'r> Decode<'r, R::Database>,
{
    let mut map = ResultRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), decode_column(row, idx, extra));
    }
    map
}

fn decode_column<R>(row: &R, idx: usize, extra: ExtraDecoder<R>) -> Value
where
    R: Row,
    usize: ColumnIndex<R>,
    i64: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    i32: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    i16: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    f64: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    f32: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    bool: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    String: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    Vec<u8>: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    Value: Type<R::Database> + for<'r> Decode<'r, R::Database>,
{
    let type_name = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return Value::Null,
    };

    if let Some(value) = extra(row, idx, &type_name) {
        return value;
    }

    let typed = if INT_TYPES.contains(&type_name.as_str()) {
        row.try_get::<i64, _>(idx)
            .map(Value::from)
            .or_else(|_| row.try_get::<i32, _>(idx).map(Value::from))
            .or_else(|_| row.try_get::<i16, _>(idx).map(Value::from))
            .ok()
    } else if FLOAT_TYPES.contains(&type_name.as_str()) {
        row.try_get::<f64, _>(idx)
            .map(float_value)
            .or_else(|_| row.try_get::<f32, _>(idx).map(|f| float_value(f as f64)))
            .ok()
    } else if BOOL_TYPES.contains(&type_name.as_str()) {
        row.try_get::<bool, _>(idx).map(Value::Bool).ok()
    } else if BLOB_TYPES.contains(&type_name.as_str()) {
        row.try_get::<Vec<u8>, _>(idx).map(bytes_value).ok()
    } else if JSON_TYPES.contains(&type_name.as_str()) {
        row.try_get::<Value, _>(idx).ok()
    } else {
        None
    };

    typed.unwrap_or_else(|| fallback(row, idx, &type_name))
}

/// 类型名无法识别时按 文本 -> 整数 -> 浮点 -> 布尔 -> 字节 依次尝试
fn fallback<R>(row: &R, idx: usize, type_name: &str) -> Value
where
    R: Row,
    usize: ColumnIndex<R>,
    i64: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    f64: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    bool: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    String: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    Vec<u8>: Type<R::Database> + for<'r> Decode<'r, R::Database>,
{
    row.try_get::<String, _>(idx)
        .map(Value::String)
        .or_else(|_| row.try_get::<i64, _>(idx).map(Value::from))
        .or_else(|_| row.try_get::<f64, _>(idx).map(float_value))
        .or_else(|_| row.try_get::<bool, _>(idx).map(Value::Bool))
        .or_else(|_| row.try_get::<Vec<u8>, _>(idx).map(bytes_value))
        .unwrap_or_else(|_| {
            let column = row.columns().get(idx).map(|c| c.name()).unwrap_or_default();
            tracing::debug!(column, type_name, "unsupported column type, returning null");
            Value::Null
        })
}

fn to_string_value<T: ToString>(v: T) -> Value {
    Value::String(v.to_string())
}

#[cfg(feature = "mysql")]
fn mysql_extra(row: &sqlx::mysql::MySqlRow, idx: usize, type_name: &str) -> Option<Value> {
    if type_name.contains("UNSIGNED") {
        return row.try_get::<u64, _>(idx).map(Value::from).ok();
    }
    match type_name {
        "DECIMAL" => row
            .try_get::<bigdecimal::BigDecimal, _>(idx)
            .map(to_string_value)
            .ok(),
        "DATETIME" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(to_string_value)
            .ok(),
        "TIMESTAMP" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| Value::String(v.to_rfc3339()))
            .ok(),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(to_string_value)
            .ok(),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .map(to_string_value)
            .ok(),
        _ => None,
    }
}

#[cfg(feature = "postgres")]
fn postgres_extra(row: &sqlx::postgres::PgRow, idx: usize, type_name: &str) -> Option<Value> {
    match type_name {
        "UUID" => row
            .try_get_unchecked::<Vec<u8>, _>(idx)
            .ok()
            .and_then(|b| format_uuid(&b))
            .or_else(|| row.try_get_unchecked::<String, _>(idx).ok())
            .map(Value::String),
        "NUMERIC" => row
            .try_get::<bigdecimal::BigDecimal, _>(idx)
            .map(to_string_value)
            .ok(),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(to_string_value)
            .ok(),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| Value::String(v.to_rfc3339()))
            .ok(),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(to_string_value)
            .ok(),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .map(to_string_value)
            .ok(),
        _ => None,
    }
}

#[cfg(feature = "sqlite")]
fn sqlite_extra(row: &sqlx::sqlite::SqliteRow, idx: usize, type_name: &str) -> Option<Value> {
    match type_name {
        "DATETIME" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(to_string_value)
            .ok(),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(to_string_value)
            .ok(),
        _ => None,
    }
}

#[cfg(feature = "mysql")]
pub(crate) fn mysql_row(row: &sqlx::mysql::MySqlRow) -> ResultRow {
    row_to_map(row, mysql_extra)
}

#[cfg(feature = "postgres")]
pub(crate) fn postgres_row(row: &sqlx::postgres::PgRow) -> ResultRow {
    row_to_map(row, postgres_extra)
}

#[cfg(feature = "sqlite")]
pub(crate) fn sqlite_row(row: &sqlx::sqlite::SqliteRow) -> ResultRow {
    row_to_map(row, sqlite_extra)
}

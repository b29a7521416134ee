//! 绑定值与有序参数表

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// 绑定值，用于安全地传递参数
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    String(String),
    Int64(i64),
    Int32(i32),
    Int16(i16),
    Float64(f64),
    Float32(f32),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
}

impl BindValue {
    pub fn is_null(&self) -> bool {
        matches!(self, BindValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BindValue::Int64(i) => Some(*i),
            BindValue::Int32(i) => Some(*i as i64),
            BindValue::Int16(i) => Some(*i as i64),
            BindValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 转换为 JSON 值，供模板渲染上下文使用
    pub fn to_json(&self) -> Value {
        match self {
            BindValue::String(s) => Value::String(s.clone()),
            BindValue::Int64(i) => Value::from(*i),
            BindValue::Int32(i) => Value::from(*i),
            BindValue::Int16(i) => Value::from(*i),
            BindValue::Float64(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            BindValue::Float32(f) => serde_json::Number::from_f64(*f as f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            BindValue::Bool(b) => Value::Bool(*b),
            BindValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            BindValue::Null => Value::Null,
        }
    }
}

impl Serialize for BindValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BindValue::String(s) => serializer.serialize_str(s),
            BindValue::Int64(i) => serializer.serialize_i64(*i),
            BindValue::Int32(i) => serializer.serialize_i32(*i),
            BindValue::Int16(i) => serializer.serialize_i16(*i),
            BindValue::Float64(f) => serializer.serialize_f64(*f),
            BindValue::Float32(f) => serializer.serialize_f32(*f),
            BindValue::Bool(b) => serializer.serialize_bool(*b),
            BindValue::Bytes(b) => serializer.serialize_bytes(b),
            BindValue::Null => serializer.serialize_none(),
        }
    }
}

impl From<String> for BindValue {
    fn from(s: String) -> Self {
        BindValue::String(s)
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        BindValue::String(s.to_string())
    }
}

impl From<i64> for BindValue {
    fn from(i: i64) -> Self {
        BindValue::Int64(i)
    }
}

impl From<i32> for BindValue {
    fn from(i: i32) -> Self {
        BindValue::Int32(i)
    }
}

impl From<i16> for BindValue {
    fn from(i: i16) -> Self {
        BindValue::Int16(i)
    }
}

impl From<f64> for BindValue {
    fn from(f: f64) -> Self {
        BindValue::Float64(f)
    }
}

impl From<f32> for BindValue {
    fn from(f: f32) -> Self {
        BindValue::Float32(f)
    }
}

impl From<bool> for BindValue {
    fn from(b: bool) -> Self {
        BindValue::Bool(b)
    }
}

impl From<Vec<u8>> for BindValue {
    fn from(b: Vec<u8>) -> Self {
        BindValue::Bytes(b)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(BindValue::Null)
    }
}

/// 有序参数表：列名 -> 绑定值
///
/// 同时用于插入/更新的数据、WHERE 条件以及动态 SQL 的 options。
/// 保持插入顺序，重复插入同名键会覆盖旧值但保留原位置。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, BindValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<BindValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// 链式插入
    pub fn with(mut self, key: impl Into<String>, value: impl Into<BindValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&BindValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<BindValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 合并另一个参数表，同名键以 `other` 为准
    pub fn extend(&mut self, other: Params) {
        for (k, v) in other.entries {
            self.insert(k, v);
        }
    }

    /// 转换为 JSON 对象（模板渲染上下文）
    pub fn to_json(&self) -> Value {
        let map = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<BindValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, BindValue);
    type IntoIter = std::vec::IntoIter<(String, BindValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// 宏：构造 [`Params`]
///
/// ```ignore
/// let data = dbhelper::params! { "name" => "Alice", "age" => 30 };
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::Params::new();
        $(params.insert($key, $value);)+
        params
    }};
}

//! 配置
//!
//! 既可以用 serde 从任意格式反序列化，也可以从环境变量（含 `.env`）加载：
//!
//! | 变量                     | 含义                                   | 默认值 |
//! |--------------------------|----------------------------------------|--------|
//! | `DATABASE_URL`           | 默认数据库                             | 必填   |
//! | `DBHELPER_BINDS`         | 其他数据库，`name=url;name2=url2`       | 空     |
//! | `DBHELPER_SQL_DIR`       | SQL 模板根目录                          | `sql`  |
//! | `DBHELPER_SQL_EXTENSION` | SQL 模板文件扩展名                      | `sql`  |
//! | `DBHELPER_ALLOW_SHARP`   | 参数名中是否允许 `#`                    | `true` |

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{DbHelperError, Result};
use crate::named_params::ParamStyle;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    pub database_url: String,
    pub binds: BTreeMap<String, String>,
    pub sql_dir: PathBuf,
    pub sql_extension: String,
    pub allow_sharp: bool,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            binds: BTreeMap::new(),
            sql_dir: PathBuf::from("sql"),
            sql_extension: "sql".to_string(),
            allow_sharp: true,
        }
    }
}

impl HelperConfig {
    /// 从环境变量加载，会先读取当前目录下的 `.env`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = HelperConfig::default();

        config.database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| DbHelperError::Config("DATABASE_URL is not set".to_string()))?;
        if let Some(binds) = lookup("DBHELPER_BINDS") {
            config.binds = parse_binds(&binds)?;
        }
        if let Some(dir) = lookup("DBHELPER_SQL_DIR") {
            config.sql_dir = PathBuf::from(dir);
        }
        if let Some(ext) = lookup("DBHELPER_SQL_EXTENSION") {
            config.sql_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(flag) = lookup("DBHELPER_ALLOW_SHARP") {
            config.allow_sharp = parse_bool("DBHELPER_ALLOW_SHARP", &flag)?;
        }
        Ok(config)
    }

    pub fn param_style(&self) -> ParamStyle {
        ParamStyle {
            allow_sharp: self.allow_sharp,
        }
    }
}

fn parse_binds(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut binds = BTreeMap::new();
    for item in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, url) = item.split_once('=').ok_or_else(|| {
            DbHelperError::Config(format!("invalid bind '{}', expected name=url", item))
        })?;
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || url.is_empty() {
            return Err(DbHelperError::Config(format!(
                "invalid bind '{}', expected name=url",
                item
            )));
        }
        binds.insert(name.to_string(), url.to_string());
    }
    Ok(binds)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(DbHelperError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

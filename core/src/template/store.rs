//! SQL 模板存储
//!
//! 文件布局：`<root>/<seg>/.../<file>.<ext>`，查询 ID 的最后一段是文件中的查询名。
//! 一个文件内可以有多条查询，每条以 `-- name: <查询名>` 开头：
//!
//! ```sql
//! -- name: query_sensor_location_by_id
//! SELECT id, name FROM sensor_location WHERE id = :id
//! {{#if pageSize}} LIMIT {{pageSize}} OFFSET {{page_offset pageNum pageSize}}{{/if}}
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::QueryId;
use crate::error::{DbHelperError, Result};

const NAME_MARKER: &str = "-- name:";

/// 模板来源：查询 ID -> 模板源码
pub trait TemplateStore: Send + Sync {
    fn load(&self, query_id: &QueryId) -> Result<String>;
}

/// 基于目录的模板存储
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    root: PathBuf,
    extension: String,
}

impl FileTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "sql".to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, query_id: &QueryId) -> PathBuf {
        let mut path = self.root.clone();
        for dir in query_id.dirs() {
            path.push(dir);
        }
        path.push(format!("{}.{}", query_id.file(), self.extension));
        path
    }
}

impl TemplateStore for FileTemplateStore {
    fn load(&self, query_id: &QueryId) -> Result<String> {
        let path = self.file_path(query_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DbHelperError::TemplateNotFound(format!(
                    "{} (file {} does not exist)",
                    query_id,
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        find_block(&content, query_id.name()).ok_or_else(|| {
            DbHelperError::TemplateNotFound(format!(
                "{} (no '{} {}' block in {})",
                query_id,
                NAME_MARKER,
                query_id.name(),
                path.display()
            ))
        })
    }
}

/// 内存模板存储，key 为完整的查询 ID
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateStore {
    templates: HashMap<String, String>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, query_id: &str, source: impl Into<String>) -> Self {
        self.templates.insert(query_id.to_string(), source.into());
        self
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load(&self, query_id: &QueryId) -> Result<String> {
        self.templates
            .get(query_id.as_str())
            .cloned()
            .ok_or_else(|| DbHelperError::TemplateNotFound(query_id.to_string()))
    }
}

/// 从文件内容中取出指定名字的查询块；同名块以第一个为准
fn find_block(content: &str, name: &str) -> Option<String> {
    let mut current: Option<&str> = None;
    let mut lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        if let Some(rest) = line.trim_start().strip_prefix(NAME_MARKER) {
            if current == Some(name) {
                break;
            }
            current = Some(rest.trim());
            continue;
        }
        if current == Some(name) {
            lines.push(line);
        }
    }

    if current == Some(name) {
        Some(lines.join("\n").trim().to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "\
-- name: first
SELECT 1

-- name: second
SELECT *
FROM t
WHERE id = :id
-- name: first
SELECT 'duplicate'
";

    #[test]
    fn test_find_block() {
        assert_eq!(find_block(FILE, "first").as_deref(), Some("SELECT 1"));
        assert_eq!(
            find_block(FILE, "second").as_deref(),
            Some("SELECT *\nFROM t\nWHERE id = :id")
        );
        assert_eq!(find_block(FILE, "third"), None);
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("home")).unwrap();
        std::fs::write(dir.path().join("home").join("index.sql"), FILE).unwrap();

        let store = FileTemplateStore::new(dir.path());
        let id = QueryId::parse("home.index.second").unwrap();
        assert!(store.load(&id).unwrap().starts_with("SELECT *"));

        let missing_block = QueryId::parse("home.index.nope").unwrap();
        assert!(matches!(
            store.load(&missing_block),
            Err(DbHelperError::TemplateNotFound(_))
        ));

        let missing_file = QueryId::parse("home.other.first").unwrap();
        assert!(matches!(
            store.load(&missing_file),
            Err(DbHelperError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.tpl"), "-- name: all\nSELECT 2").unwrap();
        let store = FileTemplateStore::new(dir.path()).with_extension("tpl");
        let id = QueryId::parse("report.all").unwrap();
        assert_eq!(store.load(&id).unwrap(), "SELECT 2");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTemplateStore::new().with_template("a.b.c", "SELECT 1");
        assert_eq!(
            store.load(&QueryId::parse("a.b.c").unwrap()).unwrap(),
            "SELECT 1"
        );
        assert!(store.load(&QueryId::parse("a.b.d").unwrap()).is_err());
    }
}

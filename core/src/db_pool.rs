#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use sqlx::Pool;
use std::sync::Arc;

use crate::error::{DbHelperError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    MySql,
    Postgres,
    Sqlite,
}

impl DbDriver {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(DbDriver::MySql)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbDriver::Postgres)
        } else if url.starts_with("sqlite://") || url.starts_with("sqlite:") {
            Ok(DbDriver::Sqlite)
        } else {
            Err(DbHelperError::UnsupportedDatabase(url.to_string()))
        }
    }

    pub fn placeholder(&self, index: usize) -> String {
        match self {
            DbDriver::MySql | DbDriver::Sqlite => "?".to_string(),
            DbDriver::Postgres => format!("${}", index + 1),
        }
    }

    /// 转义 SQL 标识符
    pub fn escape_identifier(&self, name: &str) -> String {
        match self {
            DbDriver::MySql => format!("`{}`", name.replace('`', "``")),
            DbDriver::Postgres | DbDriver::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbPool {
    driver: DbDriver,
    #[cfg(feature = "mysql")]
    mysql: Option<Arc<Pool<sqlx::MySql>>>,
    #[cfg(feature = "postgres")]
    pg: Option<Arc<Pool<sqlx::Postgres>>>,
    #[cfg(feature = "sqlite")]
    sqlite: Option<Arc<Pool<sqlx::Sqlite>>>,
}

impl DbPool {
    /// 从数据库 URL 连接并创建 DbPool
    pub async fn connect(url: &str) -> Result<Self> {
        let driver = DbDriver::from_url(url)?;

        match driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = Pool::<sqlx::MySql>::connect(url).await?;
                Ok(Self::from_mysql_pool(Arc::new(pool)))
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = Pool::<sqlx::Postgres>::connect(url).await?;
                Ok(Self::from_postgres_pool(Arc::new(pool)))
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = Pool::<sqlx::Sqlite>::connect(url).await?;
                Ok(Self::from_sqlite_pool(Arc::new(pool)))
            }
            #[allow(unreachable_patterns)]
            _ => Err(DbHelperError::UnsupportedDatabase(format!(
                "Unsupported database driver, only mysql, postgres, sqlite is supported, got: {:?}",
                driver
            ))),
        }
    }

    /// 从 MySQL Pool 创建 DbPool
    #[cfg(feature = "mysql")]
    pub fn from_mysql_pool(pool: Arc<Pool<sqlx::MySql>>) -> Self {
        Self {
            driver: DbDriver::MySql,
            mysql: Some(pool),
            #[cfg(feature = "postgres")]
            pg: None,
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    /// 从 PostgreSQL Pool 创建 DbPool
    #[cfg(feature = "postgres")]
    pub fn from_postgres_pool(pool: Arc<Pool<sqlx::Postgres>>) -> Self {
        Self {
            driver: DbDriver::Postgres,
            #[cfg(feature = "mysql")]
            mysql: None,
            pg: Some(pool),
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    /// 从 SQLite Pool 创建 DbPool
    #[cfg(feature = "sqlite")]
    pub fn from_sqlite_pool(pool: Arc<Pool<sqlx::Sqlite>>) -> Self {
        Self {
            driver: DbDriver::Sqlite,
            #[cfg(feature = "mysql")]
            mysql: None,
            #[cfg(feature = "postgres")]
            pg: None,
            sqlite: Some(pool),
        }
    }

    pub fn driver(&self) -> DbDriver {
        self.driver
    }

    #[cfg(feature = "mysql")]
    pub fn mysql_pool(&self) -> Option<&Pool<sqlx::MySql>> {
        self.mysql.as_deref()
    }

    #[cfg(feature = "postgres")]
    pub fn pg_pool(&self) -> Option<&Pool<sqlx::Postgres>> {
        self.pg.as_deref()
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlite_pool(&self) -> Option<&Pool<sqlx::Sqlite>> {
        self.sqlite.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_from_url() {
        assert_eq!(
            DbDriver::from_url("mysql://root@localhost/test").unwrap(),
            DbDriver::MySql
        );
        assert_eq!(
            DbDriver::from_url("postgresql://localhost/test").unwrap(),
            DbDriver::Postgres
        );
        assert_eq!(
            DbDriver::from_url("sqlite::memory:").unwrap(),
            DbDriver::Sqlite
        );
        assert!(matches!(
            DbDriver::from_url("oracle://x"),
            Err(DbHelperError::UnsupportedDatabase(_))
        ));
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(DbDriver::MySql.placeholder(3), "?");
        assert_eq!(DbDriver::Sqlite.placeholder(0), "?");
        assert_eq!(DbDriver::Postgres.placeholder(0), "$1");
        assert_eq!(DbDriver::Postgres.placeholder(1), "$2");
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(DbDriver::MySql.escape_identifier("user"), "`user`");
        assert_eq!(DbDriver::Postgres.escape_identifier("user"), "\"user\"");
        assert_eq!(DbDriver::Sqlite.escape_identifier("del#flag"), "\"del#flag\"");
        assert_eq!(DbDriver::MySql.escape_identifier("a`b"), "`a``b`");
    }
}

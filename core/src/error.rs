use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbHelperError {
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabase(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("No connection pool available for driver")]
    NoPoolAvailable,
    /// 多数据库路由时指定了未配置的 bind
    #[error("Unknown database bind: {0}")]
    UnknownBind(String),
    /// 传入的数据/条件不合法（保留前缀、空表名、空数据等），在生成 SQL 之前失败
    #[error("Validation error: {0}")]
    Validation(String),
    /// SQL 中引用了参数，但调用方没有提供
    #[error("A value is required for bind parameter '{0}'")]
    MissingParam(String),
    #[error("SQL template not found: {0}")]
    TemplateNotFound(String),
    #[error("SQL template syntax error in '{query_id}': {message}")]
    TemplateSyntax { query_id: String, message: String },
    #[error("SQL template render error in '{query_id}': {message}")]
    TemplateRender { query_id: String, message: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbHelperError {
    /// 是否属于执行期错误
    ///
    /// 兼容接口只吞掉这一类错误（记录日志后返回哨兵值），
    /// 校验、模板、配置类错误始终返回给调用方。
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self,
            DbHelperError::DatabaseError(_)
                | DbHelperError::MissingParam(_)
                | DbHelperError::NoPoolAvailable
        )
    }
}

pub type Result<T> = std::result::Result<T, DbHelperError>;

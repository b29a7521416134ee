pub mod bind_value;
pub mod builder;
pub mod config;
pub mod db_pool;
pub mod error;
pub mod executor;
pub mod helper;
pub mod named_params;
pub mod row;
pub mod session;
pub mod template;
pub mod transaction;

pub use bind_value::{BindValue, Params};
pub use builder::{build_delete, build_insert, build_update, RenderedStatement, WHERE_PREFIX};
pub use config::HelperConfig;
pub use db_pool::{DbDriver, DbPool};
pub use executor::{DbExecutor, WriteResult};
pub use helper::DbHelper;
pub use named_params::{CompiledSql, ParamStyle};
pub use row::{ResultRow, ResultSet};
pub use session::{PoolSession, Session, TxSession};
pub use template::{
    strip_pagination, FileTemplateStore, HandlebarsRenderer, MemoryTemplateStore, QueryId,
    SqlLoader, SqlRenderer, TemplateStore, PAGE_NUM, PAGE_SIZE,
};
pub use transaction::Transaction;

pub use error::{DbHelperError, Result};

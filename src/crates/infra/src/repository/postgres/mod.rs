pub mod command;

use sea_orm::{DbErr, SqlErr};

/// sea-orm 错误按处理方式归类，各仓储再映射到自己的领域错误
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StoreFailure {
    /// 连接失败或连接池耗尽
    Unavailable(String),
    UniqueViolation(String),
    ForeignKeyViolation(String),
    Other(String),
}

impl From<DbErr> for StoreFailure {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                return StoreFailure::UniqueViolation(detail)
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                return StoreFailure::ForeignKeyViolation(detail)
            }
            _ => {}
        }
        match e {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StoreFailure::Unavailable(e.to_string()),
            other => StoreFailure::Other(other.to_string()),
        }
    }
}

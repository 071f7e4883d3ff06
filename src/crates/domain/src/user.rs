use super::value::UserId;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

/// 用户领域错误
#[derive(Error, Debug)]
pub enum UserError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("username already taken: {0}")]
    UsernameTaken(String),
    #[error("invalid user: {0}")]
    InvalidUser(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    DbErr(String),
}

/// 用户聚合根
///
/// 用户拥有播放列表和歌曲评分，删除用户时两者级联删除（由存储层外键保证）。
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,      // 用户登录名，唯一
    pub password_hash: String, // bcrypt 哈希
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn new(id: UserId, username: &str, password_hash: &str) -> Result<Self, UserError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(UserError::InvalidUser("username is empty".to_string()));
        }
        if password_hash.is_empty() {
            return Err(UserError::InvalidUser("password hash is empty".to_string()));
        }
        Ok(Self {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now().naive_utc(),
        })
    }
}

/// 用户仓储接口
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserError>;

    /// 插入新用户，用户名冲突时返回 `UsernameTaken`
    async fn insert(&self, user: &User) -> Result<(), UserError>;

    async fn exists(&self, id: &UserId) -> Result<bool, UserError>;
}

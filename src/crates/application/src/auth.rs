use std::sync::Arc;

use crate::command::shared::IdGenerator;
use crate::error::AppError;
use domain::user::{User, UserError, UserRepository};
use domain::value::UserId;
use log::info;

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, AppError>;
    fn verify(&self, pwd: &str, hashed_pwd: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserClaims {
    pub user_id: i64,      // token subject
    pub user_name: String, // user name
}

impl From<&User> for UserClaims {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.as_i64(),
            user_name: user.username.clone(),
        }
    }
}

pub trait TokenService: Send + Sync {
    fn issue(&self, claims: &UserClaims) -> Result<String, AppError>;
    fn verify(&self, token: &str) -> Result<UserClaims, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginResult {
    pub token: String,
    pub user_id: i64,
    pub username: String,
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    token_svc: Arc<dyn TokenService>,
    id_generator: Arc<dyn IdGenerator>,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        token_svc: Arc<dyn TokenService>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            user_repo,
            hasher,
            token_svc,
            id_generator,
        }
    }

    /// Register a new user, returns the new user id
    pub async fn signup(&self, username: &str, pwd: &str) -> Result<UserId, AppError> {
        if pwd.is_empty() {
            return Err(AppError::InvalidArgument("password is empty".to_string()));
        }
        if self.user_repo.find_by_username(username.trim()).await?.is_some() {
            return Err(UserError::UsernameTaken(username.trim().to_string()).into());
        }
        let hashed_pwd = self.hasher.hash(pwd)?;
        let id = UserId::from(self.id_generator.next_id().await?);
        let user = User::new(id, username, &hashed_pwd)?;
        self.user_repo.insert(&user).await?;
        info!("user {} signed up as {}", user.id, user.username);
        Ok(user.id)
    }

    /// Login with username and password, returns JWT token
    pub async fn login(&self, username: &str, pwd: &str) -> Result<LoginResult, AppError> {
        let user = self
            .user_repo
            .find_by_username(username.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid username or password".to_string()))?;
        self.hasher.verify(pwd, &user.password_hash)?;
        let token = self.token_svc.issue(&UserClaims::from(&user))?;
        Ok(LoginResult {
            token,
            user_id: user.id.as_i64(),
            username: user.username,
        })
    }

    /// Resolve a bearer token into the caller identity
    pub fn verify(&self, token: &str) -> Result<UserClaims, AppError> {
        self.token_svc.verify(token)
    }
}

use super::db_data::user::{self, ActiveModel, Entity};
use crate::repository::postgres::StoreFailure;
use async_trait::async_trait;
use domain::user::{User, UserError};
use domain::value::UserId;
use sea_orm::*;

fn user_err(e: DbErr) -> UserError {
    match StoreFailure::from(e) {
        StoreFailure::Unavailable(msg) => UserError::Unavailable(msg),
        StoreFailure::UniqueViolation(msg)
        | StoreFailure::ForeignKeyViolation(msg)
        | StoreFailure::Other(msg) => UserError::DbErr(msg),
    }
}

#[derive(Clone)]
pub struct UserRepositoryImpl {
    db: DatabaseConnection,
}

impl UserRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl domain::user::UserRepository for UserRepositoryImpl {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let result = Entity::find_by_id(id.as_i64())
            .one(&self.db)
            .await
            .map_err(user_err)?;
        Ok(result.map(|model| model.into()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserError> {
        let result = Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(user_err)?;
        Ok(result.map(|model| model.into()))
    }

    async fn insert(&self, agg: &User) -> Result<(), UserError> {
        let active_model: ActiveModel = agg.into();
        match Entity::insert(active_model).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) => match StoreFailure::from(e) {
                StoreFailure::UniqueViolation(_) => {
                    Err(UserError::UsernameTaken(agg.username.clone()))
                }
                StoreFailure::Unavailable(msg) => Err(UserError::Unavailable(msg)),
                StoreFailure::ForeignKeyViolation(msg) | StoreFailure::Other(msg) => {
                    Err(UserError::DbErr(msg))
                }
            },
        }
    }

    async fn exists(&self, id: &UserId) -> Result<bool, UserError> {
        let count = Entity::find_by_id(id.as_i64())
            .count(&self.db)
            .await
            .map_err(user_err)?;
        Ok(count > 0)
    }
}

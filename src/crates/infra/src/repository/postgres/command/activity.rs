use super::db_data::{song_rating, song_share};
use crate::repository::postgres::StoreFailure;
use async_trait::async_trait;
use domain::activity::{
    ActivityError, RatingOutcome, RatingSummary, SongRating, SongRatingRepository, SongShare,
    SongShareRepository,
};
use domain::value::{SongId, UserId};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;

fn activity_err(e: DbErr) -> ActivityError {
    match StoreFailure::from(e) {
        StoreFailure::Unavailable(msg) => ActivityError::Unavailable(msg),
        StoreFailure::UniqueViolation(msg)
        | StoreFailure::ForeignKeyViolation(msg)
        | StoreFailure::Other(msg) => ActivityError::DbErr(msg),
    }
}

#[derive(Clone)]
pub struct SongRatingRepositoryImpl {
    db: DbConn,
}

impl SongRatingRepositoryImpl {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SongRatingRepository for SongRatingRepositoryImpl {
    /// 先尝试插入，(user_id, song_id) 冲突时改为覆盖评分
    async fn upsert(&self, rating: &SongRating) -> Result<RatingOutcome, ActivityError> {
        let inserted = song_rating::Entity::insert(song_rating::ActiveModel::from(rating))
            .on_conflict(
                OnConflict::columns([song_rating::Column::UserId, song_rating::Column::SongId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(activity_err)?;
        if inserted > 0 {
            return Ok(RatingOutcome::Added);
        }

        song_rating::Entity::update_many()
            .col_expr(song_rating::Column::Rating, Expr::value(rating.rating))
            .col_expr(song_rating::Column::UpdatedAt, Expr::value(rating.updated_at))
            .filter(song_rating::Column::UserId.eq(rating.user_id.as_i64()))
            .filter(song_rating::Column::SongId.eq(rating.song_id.as_i64()))
            .exec(&self.db)
            .await
            .map_err(activity_err)?;
        Ok(RatingOutcome::Updated)
    }

    async fn find(
        &self,
        user_id: &UserId,
        song_id: &SongId,
    ) -> Result<Option<SongRating>, ActivityError> {
        let result = song_rating::Entity::find()
            .filter(song_rating::Column::UserId.eq(user_id.as_i64()))
            .filter(song_rating::Column::SongId.eq(song_id.as_i64()))
            .one(&self.db)
            .await
            .map_err(activity_err)?;
        Ok(result.map(|m| m.into()))
    }

    async fn summary_for_song(&self, song_id: &SongId) -> Result<RatingSummary, ActivityError> {
        // COUNT/SUM 在 Postgres 中均为 bigint，无评分时 SUM 为 NULL
        let row: Option<(i64, Option<i64>)> = song_rating::Entity::find()
            .select_only()
            .column_as(Expr::col(song_rating::Column::Id).count(), "count")
            .column_as(Expr::col(song_rating::Column::Rating).sum(), "total")
            .filter(song_rating::Column::SongId.eq(song_id.as_i64()))
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(activity_err)?;
        Ok(match row {
            Some((count, total)) => RatingSummary {
                count: count.max(0) as u64,
                total: total.unwrap_or(0),
            },
            None => RatingSummary::default(),
        })
    }
}

#[derive(Clone)]
pub struct SongShareRepositoryImpl {
    db: DbConn,
}

impl SongShareRepositoryImpl {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SongShareRepository for SongShareRepositoryImpl {
    async fn append(&self, share: &SongShare) -> Result<(), ActivityError> {
        song_share::Entity::insert(song_share::ActiveModel::from(share))
            .exec(&self.db)
            .await
            .map_err(activity_err)?;
        Ok(())
    }
}

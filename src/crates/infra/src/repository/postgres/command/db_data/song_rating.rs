use domain::activity::SongRating;
use domain::value::{SongId, SongRatingId, UserId};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

/// 每个 (user_id, song_id) 至多一条评分
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "song_rating")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub user_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub song_id: i64,
    pub rating: i32,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SongRating> for ActiveModel {
    fn from(rating: &SongRating) -> Self {
        Self {
            id: Set(rating.id.as_i64()),
            user_id: Set(rating.user_id.as_i64()),
            song_id: Set(rating.song_id.as_i64()),
            rating: Set(rating.rating),
            updated_at: Set(rating.updated_at),
        }
    }
}

impl From<Model> for SongRating {
    fn from(model: Model) -> Self {
        SongRating {
            id: SongRatingId::from(model.id),
            user_id: UserId::from(model.user_id),
            song_id: SongId::from(model.song_id),
            rating: model.rating,
            updated_at: model.updated_at,
        }
    }
}

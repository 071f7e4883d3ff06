use domain::catalog::Song;
use domain::value::{AlbumId, ArtistId, GenreId, SongId};
use sea_orm::entity::prelude::*;

/// 歌曲行由外部导入任务写入
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "song")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub id: i64,
    pub title: String,
    #[sea_orm(column_type = "BigInteger")]
    pub artist_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub genre_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub album_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for Song {
    fn from(model: &Model) -> Self {
        Song {
            id: SongId::from(model.id),
            title: model.title.clone(),
            artist_id: ArtistId::from(model.artist_id),
            genre_id: GenreId::from(model.genre_id),
            album_id: AlbumId::from(model.album_id),
        }
    }
}

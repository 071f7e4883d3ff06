use domain::catalog::Album;
use domain::value::{AlbumId, ArtistId};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "album")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub id: i64,
    pub title: String,
    #[sea_orm(column_type = "BigInteger")]
    pub artist_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Album {
    fn from(model: Model) -> Self {
        Album {
            id: AlbumId::from(model.id),
            title: model.title,
            artist_id: ArtistId::from(model.artist_id),
        }
    }
}
